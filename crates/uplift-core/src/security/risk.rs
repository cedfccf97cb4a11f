//! Ordered risk tiers, one enum per validator family.
//!
//! Tiers derive `Ord` from declaration order, so "never downgrade" is simply
//! `max`. Nothing compares tiers by name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Common behaviour of every family's risk enum
pub trait RiskTier: Copy + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Lowest tier of the family
    const LOWEST: Self;
    /// Highest tier of the family
    const HIGHEST: Self;
    /// Lowest tier the family always rejects, whatever the policy
    const REJECT_AT: Self;

    /// All tiers in ascending order
    fn all() -> &'static [Self];

    fn as_str(&self) -> &'static str;

    fn rejects(self) -> bool {
        self >= Self::REJECT_AT
    }

    /// Raise to `other` if it is more severe; never lowers
    fn escalate(self, other: Self) -> Self {
        self.max(other)
    }
}

macro_rules! risk_tier {
    (@first $first:ident $(, $rest:ident)*) => { Self::$first };
    (@last $first:ident) => { Self::$first };
    (@last $first:ident, $($rest:ident),+) => { risk_tier!(@last $($rest),+) };
    (
        $(#[$meta:meta])*
        $name:ident rejected_from $reject:ident {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl RiskTier for $name {
            const LOWEST: Self = risk_tier!(@first $($variant),+);
            const HIGHEST: Self = risk_tier!(@last $($variant),+);
            const REJECT_AT: Self = Self::$reject;

            fn all() -> &'static [Self] {
                &[$(Self::$variant),+]
            }

            fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

risk_tier! {
    /// Risk of a shell command
    CommandRisk rejected_from Forbidden {
        /// Read-only tools
        Safe => "safe",
        /// Text-munging tools, always allowed but tracked
        Restricted => "restricted",
        /// Tools that create or move files; gated by `allow_dangerous`
        Dangerous => "dangerous",
        Forbidden => "forbidden",
    }
}

risk_tier! {
    /// Risk of a filesystem path
    PathRisk rejected_from Dangerous {
        Safe => "safe",
        Suspicious => "suspicious",
        Dangerous => "dangerous",
        Forbidden => "forbidden",
    }
}

risk_tier! {
    /// Risk of a SQL identifier or query
    ///
    /// `Suspicious` is accepted with a flag; it is the only non-terminal
    /// warning tier across the families.
    SqlRisk rejected_from Dangerous {
        Safe => "safe",
        Suspicious => "suspicious",
        Dangerous => "dangerous",
        Forbidden => "forbidden",
    }
}

risk_tier! {
    /// Risk of plugin source code
    PluginRisk rejected_from Critical {
        Safe => "safe",
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}
