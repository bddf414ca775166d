//! Content modalities extracted from a document.
//!
//! Every stored summary is tagged with the modality of the raw content it
//! was derived from, and query-time retrieval splits results on this tag.

/// One of the three kinds of content a textbook page yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Table,
    Image,
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modality::Text => write!(f, "text"),
            Modality::Table => write!(f, "table"),
            Modality::Image => write!(f, "image"),
        }
    }
}

impl std::str::FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Modality::Text),
            "table" => Ok(Modality::Table),
            "image" => Ok(Modality::Image),
            _ => Err(format!("Unknown modality: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_display_round_trips_through_from_str() {
        for m in [Modality::Text, Modality::Table, Modality::Image] {
            assert_eq!(Modality::from_str(&m.to_string()).unwrap(), m);
        }
    }

    #[test]
    fn test_unknown_modality_is_rejected() {
        assert!(Modality::from_str("video").is_err());
    }
}
