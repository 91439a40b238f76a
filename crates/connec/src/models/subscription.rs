//! Subscription set: which resource types are imported
//!
//! Serialized as a JSON object mapping resource name to an enabled flag.
//! The object's key order is preserved and determines the order in which
//! resource types are synchronized.

use anyhow::{Context, Result, bail};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single resource type and whether it is imported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub resource: String,
    pub enabled: bool,
}

impl Subscription {
    pub fn new(resource: impl Into<String>, enabled: bool) -> Self {
        Self {
            resource: resource.into(),
            enabled,
        }
    }
}

/// Ordered resource-type subscriptions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscriptions(Vec<Subscription>);

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(resource, enabled)` pairs, keeping their order
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        let mut subscriptions = Self::new();
        for (resource, enabled) in pairs {
            subscriptions.set(resource, enabled);
        }
        subscriptions
    }

    /// Parse a comma-separated `name=bool` list, e.g. `organizations=true,items=false`
    ///
    /// A bare name is treated as enabled.
    pub fn parse_list(input: &str) -> Result<Self> {
        let mut subscriptions = Self::new();
        for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, enabled) = match entry.split_once('=') {
                Some((name, flag)) => {
                    let enabled = flag
                        .trim()
                        .parse::<bool>()
                        .with_context(|| format!("Invalid subscription flag in '{entry}'"))?;
                    (name.trim(), enabled)
                }
                None => (entry, true),
            };
            if name.is_empty() {
                bail!("Subscription entry '{entry}' has no resource name");
            }
            subscriptions.set(name, enabled);
        }
        Ok(subscriptions)
    }

    /// Insert or update a subscription; an existing entry keeps its position
    pub fn set(&mut self, resource: impl Into<String>, enabled: bool) {
        let resource = resource.into();
        match self.0.iter_mut().find(|s| s.resource == resource) {
            Some(existing) => existing.enabled = enabled,
            None => self.0.push(Subscription { resource, enabled }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.0.iter()
    }

    /// Enabled resource names in subscription order
    pub fn enabled(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter(|s| s.enabled).map(|s| s.resource.as_str())
    }

    pub fn is_enabled(&self, resource: &str) -> bool {
        self.0.iter().any(|s| s.enabled && s.resource == resource)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Subscriptions {
    type Item = &'a Subscription;
    type IntoIter = std::slice::Iter<'a, Subscription>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for Subscriptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for subscription in &self.0 {
            map.serialize_entry(&subscription.resource, &subscription.enabled)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Subscriptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SubscriptionsVisitor;

        impl<'de> Visitor<'de> for SubscriptionsVisitor {
            type Value = Subscriptions;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of resource names to booleans")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut subscriptions = Subscriptions::new();
                while let Some((resource, enabled)) = access.next_entry::<String, bool>()? {
                    subscriptions.set(resource, enabled);
                }
                Ok(subscriptions)
            }
        }

        deserializer.deserialize_map(SubscriptionsVisitor)
    }
}
