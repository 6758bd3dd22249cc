//! Feature descriptors: the opaque capability signatures plugins advertise,
//! and the `Capability` trait the loader uses to compare them without
//! understanding what they mean.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The kind of a single descriptor in a plugin's feature array.
///
/// `Provide` marks the start of one offered capability; `Depends`/`Sdepend`
/// entries immediately following a `Provide` are its dependency window;
/// `Register`/`Callback` entries carry the context passed to the load/unload
/// action for the next `Provide` encountered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Provide,
    Register,
    Callback,
    Depends,
    Sdepend,
}

impl FeatureKind {
    pub fn is_dependency(self) -> bool {
        matches!(self, FeatureKind::Depends | FeatureKind::Sdepend)
    }
}

/// Injected equality/matching/hash semantics for a capability signature.
///
/// The loader never interprets what a capability *means*; it only calls
/// these three predicates. `equals` must imply `matches`, and `hash_key`
/// must agree with `equals` (equal capabilities hash identically).
pub trait Capability: fmt::Debug + Send + Sync {
    fn hash_key(&self) -> u64;
    fn equals(&self, other: &dyn Capability) -> bool;
    fn matches(&self, other: &dyn Capability) -> bool;
    fn describe(&self) -> String;
    fn as_any(&self) -> &dyn Any;
}

/// One descriptor: a kind plus its opaque capability signature.
#[derive(Clone)]
pub struct FeatureDescriptor {
    pub kind: FeatureKind,
    pub capability: Arc<dyn Capability>,
}

impl FeatureDescriptor {
    pub fn new(kind: FeatureKind, capability: Arc<dyn Capability>) -> Self {
        Self { kind, capability }
    }

    pub fn provide(capability: impl Capability + 'static) -> Self {
        Self::new(FeatureKind::Provide, Arc::new(capability))
    }

    pub fn depends(capability: impl Capability + 'static) -> Self {
        Self::new(FeatureKind::Depends, Arc::new(capability))
    }

    pub fn soft_depends(capability: impl Capability + 'static) -> Self {
        Self::new(FeatureKind::Sdepend, Arc::new(capability))
    }

    pub fn register(capability: impl Capability + 'static) -> Self {
        Self::new(FeatureKind::Register, Arc::new(capability))
    }

    pub fn callback(capability: impl Capability + 'static) -> Self {
        Self::new(FeatureKind::Callback, Arc::new(capability))
    }
}

impl fmt::Debug for FeatureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureDescriptor")
            .field("kind", &self.kind)
            .field("capability", &self.capability.describe())
            .finish()
    }
}

/// Default capability signature: strongSwan-flavored `{category, name}`
/// pairs with a wildcard variant. Embedders with richer capability
/// semantics (real crypto algorithm identifiers, versioned APIs, ...)
/// should implement `Capability` for their own type instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signature {
    /// An exact capability, e.g. `{category: "db", name: "sqlite"}`.
    Exact { category: &'static str, name: String },
    /// Matches any `Exact`/`Named` in the same category, e.g. `db *`.
    Any { category: &'static str },
    /// A register/callback context marker carried through to the load
    /// action but never matched against.
    Context(String),
}

impl Capability for Signature {
    fn hash_key(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        match self {
            Signature::Exact { category, name } => {
                0u8.hash(&mut hasher);
                category.hash(&mut hasher);
                name.hash(&mut hasher);
            }
            Signature::Any { category } => {
                1u8.hash(&mut hasher);
                category.hash(&mut hasher);
            }
            Signature::Context(label) => {
                2u8.hash(&mut hasher);
                label.hash(&mut hasher);
            }
        }
        hasher.finish()
    }

    fn equals(&self, other: &dyn Capability) -> bool {
        other
            .as_any()
            .downcast_ref::<Signature>()
            .is_some_and(|o| o == self)
    }

    fn matches(&self, other: &dyn Capability) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Signature>() else {
            return false;
        };
        if self == other {
            return true;
        }
        match (self, other) {
            (Signature::Any { category: a }, Signature::Exact { category: b, .. })
            | (Signature::Exact { category: b, .. }, Signature::Any { category: a }) => a == b,
            (Signature::Any { category: a }, Signature::Any { category: b }) => a == b,
            _ => false,
        }
    }

    fn describe(&self) -> String {
        match self {
            Signature::Exact { category, name } => format!("{category}:{name}"),
            Signature::Any { category } => format!("{category}:*"),
            Signature::Context(label) => format!("ctx:{label}"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(category: &'static str, name: &str) -> Signature {
        Signature::Exact {
            category,
            name: name.to_string(),
        }
    }

    #[test]
    fn equals_implies_matches() {
        let a = sig("db", "sqlite");
        let b = sig("db", "sqlite");
        assert!(a.equals(&b));
        assert!(a.matches(&b));
    }

    #[test]
    fn wildcard_matches_but_does_not_equal() {
        let any = Signature::Any { category: "db" };
        let sqlite = sig("db", "sqlite");
        assert!(any.matches(&sqlite));
        assert!(sqlite.matches(&any));
        assert!(!any.equals(&sqlite));
        assert!(!sqlite.equals(&any));
    }

    #[test]
    fn different_category_never_matches() {
        let any_db = Signature::Any { category: "db" };
        let crypter = sig("crypter", "aes128cbc");
        assert!(!any_db.matches(&crypter));
    }
}
