//! The feature registry: a mapping from canonical capability to the
//! set of providers offering it, plus the exact/fuzzy lookup primitives the
//! load engine drives dependency resolution with.

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::Capability;
use crate::entry::ProvidedFeatureId;

/// Arena index for a `RegisteredFeature` stored in `FeatureRegistry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisteredFeatureId(u32);

/// One registry record: a canonical capability and every provider offering
/// a capability equal to it.
pub struct RegisteredFeature {
    pub capability: Arc<dyn Capability>,
    /// Which provider `capability` was copied from; used to decide whether
    /// removing a provider requires rebinding the canonical capability.
    canonical_provider: ProvidedFeatureId,
    pub providers: Vec<ProvidedFeatureId>,
}

#[derive(Default)]
pub struct FeatureRegistry {
    records: Vec<Option<RegisteredFeature>>,
    /// Hash buckets over `hash_key()`, used for the exact/native lookup.
    buckets: HashMap<u64, Vec<RegisteredFeatureId>>,
    /// Reverse index: which record each provider belongs to, for O(1)
    /// unregistration.
    provider_record: HashMap<ProvidedFeatureId, RegisteredFeatureId>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, id: RegisteredFeatureId) -> &RegisteredFeature {
        self.records[id.0 as usize]
            .as_ref()
            .expect("registered feature id must be live")
    }

    fn record_mut(&mut self, id: RegisteredFeatureId) -> &mut RegisteredFeature {
        self.records[id.0 as usize]
            .as_mut()
            .expect("registered feature id must be live")
    }

    /// Native hash lookup by `equals` (the exact lookup path).
    pub fn get_exact(&self, capability: &dyn Capability) -> Option<RegisteredFeatureId> {
        self.buckets
            .get(&capability.hash_key())?
            .iter()
            .copied()
            .find(|&id| self.record(id).capability.equals(capability))
    }

    /// Linear scan returning the first record satisfying `predicate`
    /// (`get_match`).
    pub fn get_match(
        &self,
        predicate: impl Fn(&RegisteredFeature) -> bool,
    ) -> Option<RegisteredFeatureId> {
        self.records.iter().enumerate().find_map(|(i, slot)| {
            slot.as_ref()
                .filter(|r| predicate(r))
                .map(|_| RegisteredFeatureId(i as u32))
        })
    }

    pub fn get(&self, id: RegisteredFeatureId) -> &RegisteredFeature {
        self.record(id)
    }

    /// Register `provider` under `capability`, creating a new record if no
    /// equal capability is already registered.
    pub fn register(&mut self, provider: ProvidedFeatureId, capability: Arc<dyn Capability>) {
        if let Some(id) = self.get_exact(capability.as_ref()) {
            self.record_mut(id).providers.push(provider);
            self.provider_record.insert(provider, id);
            return;
        }

        let id = RegisteredFeatureId(self.records.len() as u32);
        let hash_key = capability.hash_key();
        self.records.push(Some(RegisteredFeature {
            capability,
            canonical_provider: provider,
            providers: vec![provider],
        }));
        self.buckets.entry(hash_key).or_default().push(id);
        self.provider_record.insert(provider, id);
    }

    /// Remove `provider` from its record. If the
    /// record becomes empty it is dropped entirely; if `provider` was the
    /// canonical capability source, the record rebinds to the first
    /// remaining provider. `provider_capability` supplies the capability to
    /// rebind to, keyed by the remaining provider id the caller looks up.
    pub fn unregister(
        &mut self,
        provider: ProvidedFeatureId,
        remaining_capability: impl FnOnce(ProvidedFeatureId) -> Arc<dyn Capability>,
    ) {
        let Some(&id) = self.provider_record.get(&provider) else {
            return;
        };
        self.provider_record.remove(&provider);

        let record = self.record_mut(id);
        record.providers.retain(|&p| p != provider);

        if record.providers.is_empty() {
            let hash_key = record.capability.hash_key();
            self.records[id.0 as usize] = None;
            if let Some(bucket) = self.buckets.get_mut(&hash_key) {
                bucket.retain(|&b| b != id);
                if bucket.is_empty() {
                    self.buckets.remove(&hash_key);
                }
            }
            return;
        }

        if record.canonical_provider == provider {
            let new_canonical = record.providers[0];
            record.capability = remaining_capability(new_canonical);
            record.canonical_provider = new_canonical;
        }
    }

    pub fn record_for(&self, provider: ProvidedFeatureId) -> Option<RegisteredFeatureId> {
        self.provider_record.get(&provider).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Signature;

    fn pf(n: u32) -> ProvidedFeatureId {
        ProvidedFeatureId(n)
    }

    fn sqlite() -> Arc<dyn Capability> {
        Arc::new(Signature::Exact {
            category: "db",
            name: "sqlite".into(),
        })
    }

    #[test]
    fn register_and_exact_lookup() {
        let mut reg = FeatureRegistry::new();
        reg.register(pf(0), sqlite());
        let id = reg.get_exact(sqlite().as_ref()).expect("found");
        assert_eq!(reg.get(id).providers, vec![pf(0)]);
    }

    #[test]
    fn second_equal_provider_joins_same_record() {
        let mut reg = FeatureRegistry::new();
        reg.register(pf(0), sqlite());
        reg.register(pf(1), sqlite());
        let id = reg.get_exact(sqlite().as_ref()).unwrap();
        assert_eq!(reg.get(id).providers, vec![pf(0), pf(1)]);
    }

    #[test]
    fn unregister_last_provider_drops_record() {
        let mut reg = FeatureRegistry::new();
        reg.register(pf(0), sqlite());
        reg.unregister(pf(0), |_| unreachable!());
        assert!(reg.get_exact(sqlite().as_ref()).is_none());
    }

    #[test]
    fn unregister_canonical_rebinds_to_remaining_provider() {
        let mut reg = FeatureRegistry::new();
        reg.register(pf(0), sqlite());
        reg.register(pf(1), sqlite());
        reg.unregister(pf(0), |remaining| {
            assert_eq!(remaining, pf(1));
            sqlite()
        });
        let id = reg.get_exact(sqlite().as_ref()).unwrap();
        assert_eq!(reg.get(id).providers, vec![pf(1)]);
    }
}
