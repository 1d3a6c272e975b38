/// Source site identifiers
///
/// Every listing belongs to exactly one bank website. The string tag is what the
/// registry stores in its `company` column, so it must never change.
use std::fmt;
use std::str::FromStr;

use crate::SyncError;

/// Identifies the bank website a listing was discovered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceId {
    Banesco,
    BancoGeneral,
    BancoNacional,
    CajaDeAhorros,
    Scotiabank,
    GlobalBank,
}

impl SourceId {
    /// Converts the source to the tag stored in the registry
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Banesco => "banesco",
            Self::BancoGeneral => "banco-general",
            Self::BancoNacional => "banco-nacional",
            Self::CajaDeAhorros => "caja-de-ahorros",
            Self::Scotiabank => "scotiabank",
            Self::GlobalBank => "global-bank",
        }
    }

    /// Parses a registry tag back into a source
    ///
    /// Returns None if the tag doesn't match any known source.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "banesco" => Some(Self::Banesco),
            "banco-general" => Some(Self::BancoGeneral),
            "banco-nacional" => Some(Self::BancoNacional),
            "caja-de-ahorros" => Some(Self::CajaDeAhorros),
            "scotiabank" => Some(Self::Scotiabank),
            "global-bank" => Some(Self::GlobalBank),
            _ => None,
        }
    }

    /// Returns all known sources
    pub fn all() -> Vec<Self> {
        vec![
            Self::Banesco,
            Self::BancoGeneral,
            Self::BancoNacional,
            Self::CajaDeAhorros,
            Self::Scotiabank,
            Self::GlobalBank,
        ]
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

impl FromStr for SourceId {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s.trim()).ok_or_else(|| SyncError::UnknownSource(s.to_string()))
    }
}
