//! Numeric id newtypes.
//!
//! Connection ids are assigned by the transport at accept time. Subscription
//! ids are chosen by the client and only scoped to its own connection, so the
//! two must never be mixed up.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Wrap a raw value.
            #[must_use]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Return the raw value.
            #[must_use]
            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $inner {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<$inner>().map(Self)
            }
        }
    };
}

numeric_id! {
    /// Transport-assigned identifier of a live connection.
    ConnectionId(u64)
}

numeric_id! {
    /// Client-chosen identifier of a subscription, unique per connection.
    SubscriptionId(i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_raw_number() {
        assert_eq!(ConnectionId::new(42).to_string(), "42");
        assert_eq!(SubscriptionId::new(-3).to_string(), "-3");
    }

    #[test]
    fn parse_subscription_id() {
        assert_eq!("7".parse::<SubscriptionId>().unwrap(), SubscriptionId::new(7));
        assert_eq!("+7".parse::<SubscriptionId>().unwrap(), SubscriptionId::new(7));
        assert!("abc".parse::<SubscriptionId>().is_err());
        assert!("".parse::<SubscriptionId>().is_err());
        assert!("1.5".parse::<SubscriptionId>().is_err());
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&ConnectionId::new(9)).unwrap();
        assert_eq!(json, "9");
        let back: ConnectionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(), 9);
    }

    #[test]
    fn conversions() {
        let id: ConnectionId = 5u64.into();
        let raw: u64 = id.into();
        assert_eq!(raw, 5);
    }
}
