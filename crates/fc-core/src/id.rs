use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

/// Process-wide interner backing every canvas identifier.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Prefix carried by every ephemeral predicted-node id.
pub const PREDICTED_PREFIX: &str = "predicted-";

/// Prefix carried by predicted producers (candidates feeding an input port).
pub const PREDICTED_OUTPUT_PREFIX: &str = "predicted-output-";

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a string as an id, or return the existing one.
            pub fn intern(s: &str) -> Self {
                $name(INTERNER.get_or_intern(s))
            }

            /// Resolve back to a string slice.
            pub fn as_str(&self) -> &str {
                INTERNER.resolve(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        /// Ordered by the underlying string, not by interning order.
        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.as_str().cmp(other.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::intern(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok(Self::intern(&s))
            }
        }
    };
}

interned_id!(
    /// Identity of a placed node, stable for the node's lifetime.
    NodeId
);

interned_id!(
    /// Port id, unique within one node specification.
    PortId
);

interned_id!(
    /// Edge identity, derived from its endpoints plus a timestamp.
    EdgeId
);

interned_id!(
    /// Identity of a node specification in the catalog.
    SpecId
);

impl NodeId {
    /// A node id of the form `{spec}-{timestamp}`, as used for pasted and
    /// dropped nodes. `attempt > 0` appends a disambiguating suffix.
    ///
    /// Spec ids that collide with the predicted prefix get a `node-` prefix,
    /// so a placed node is never mistaken for a suggestion.
    pub fn timestamped(spec: SpecId, timestamp_ms: u64, attempt: u32) -> Self {
        let escape = if spec.as_str().starts_with(PREDICTED_PREFIX) {
            "node-"
        } else {
            ""
        };
        if attempt == 0 {
            Self::intern(&format!("{escape}{spec}-{timestamp_ms}"))
        } else {
            Self::intern(&format!("{escape}{spec}-{timestamp_ms}-{attempt}"))
        }
    }

    /// Whether this id belongs to an ephemeral predicted node.
    pub fn is_predicted(&self) -> bool {
        self.as_str().starts_with(PREDICTED_PREFIX)
    }
}

impl EdgeId {
    /// Edge id built from the connection signature and a timestamp.
    pub fn for_connection(
        source: NodeId,
        source_port: PortId,
        target: NodeId,
        target_port: PortId,
        timestamp_ms: u64,
    ) -> Self {
        Self::intern(&format!(
            "{source}-{source_port}-{target}-{target_port}-{timestamp_ms}"
        ))
    }
}
