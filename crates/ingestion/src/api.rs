//! Wire formats of the catalog and detail endpoints.
//!
//! Detail decoding is lenient: missing or null `height`, `weight`,
//! `types`, `stats` and `base_stat` default to zero or empty.

use serde::Deserialize;

use dex_common::{CatalogEntry, ItemDetail, Stat};

/// `GET <base>?limit=N&offset=0`
#[derive(Debug, Deserialize)]
pub struct CatalogListResponse {
    pub results: Vec<CatalogEntry>,
}

/// `GET <detailRef>`
#[derive(Debug, Deserialize)]
pub struct DetailResponse {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub height: Option<i32>,
    #[serde(default)]
    pub weight: Option<i32>,
    #[serde(default)]
    pub types: Option<Vec<TypeSlot>>,
    #[serde(default)]
    pub stats: Option<Vec<StatSlot>>,
}

#[derive(Debug, Deserialize)]
pub struct NamedResource {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TypeSlot {
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Deserialize)]
pub struct StatSlot {
    pub stat: NamedResource,
    #[serde(default)]
    pub base_stat: Option<i32>,
}

impl From<DetailResponse> for ItemDetail {
    fn from(detail: DetailResponse) -> Self {
        ItemDetail {
            id: detail.id,
            name: detail.name,
            height: detail.height.unwrap_or_default(),
            weight: detail.weight.unwrap_or_default(),
            type_tags: detail
                .types
                .unwrap_or_default()
                .into_iter()
                .map(|slot| slot.kind.name)
                .collect(),
            base_stats: detail
                .stats
                .unwrap_or_default()
                .into_iter()
                .map(|slot| Stat::new(slot.stat.name, slot.base_stat.unwrap_or_default()))
                .collect(),
        }
    }
}

pub fn decode_catalog(body: &[u8]) -> Result<Vec<CatalogEntry>, serde_json::Error> {
    let list: CatalogListResponse = serde_json::from_slice(body)?;
    Ok(list.results)
}

pub fn decode_detail(body: &[u8]) -> Result<ItemDetail, serde_json::Error> {
    let detail: DetailResponse = serde_json::from_slice(body)?;
    Ok(detail.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_catalog() {
        let body = br#"{
            "count": 1302,
            "next": "https://pokeapi.co/api/v2/pokemon?offset=2&limit=2",
            "results": [
                {"name": "bulbasaur", "url": "https://pokeapi.co/api/v2/pokemon/1/"},
                {"name": "ivysaur", "url": "https://pokeapi.co/api/v2/pokemon/2/"}
            ]
        }"#;

        let entries = decode_catalog(body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].name, "ivysaur");
        assert_eq!(entries[1].detail_ref, "https://pokeapi.co/api/v2/pokemon/2/");
    }

    #[test]
    fn test_decode_catalog_without_results_fails() {
        assert!(decode_catalog(br#"{"count": 0}"#).is_err());
        assert!(decode_catalog(b"<html>").is_err());
    }

    #[test]
    fn test_decode_detail_full() {
        let body = br#"{
            "id": 1,
            "name": "bulbasaur",
            "height": 7,
            "weight": 69,
            "types": [{"slot": 1, "type": {"name": "grass"}}, {"slot": 2, "type": {"name": "poison"}}],
            "stats": [
                {"base_stat": 45, "effort": 0, "stat": {"name": "hp"}},
                {"base_stat": 49, "effort": 0, "stat": {"name": "attack"}}
            ]
        }"#;

        let detail = decode_detail(body).unwrap();
        assert_eq!(detail.id, 1);
        assert_eq!(detail.height, 7);
        assert_eq!(detail.weight, 69);
        assert_eq!(detail.type_tags, vec!["grass", "poison"]);
        assert_eq!(
            detail.base_stats,
            vec![Stat::new("hp", 45), Stat::new("attack", 49)]
        );
    }

    #[test]
    fn test_decode_detail_defaults_missing_fields() {
        let body = br#"{
            "id": 132,
            "name": "ditto",
            "weight": null,
            "stats": [{"stat": {"name": "hp"}}]
        }"#;

        let detail = decode_detail(body).unwrap();
        assert_eq!(detail.height, 0);
        assert_eq!(detail.weight, 0);
        assert!(detail.type_tags.is_empty());
        assert_eq!(detail.base_stats, vec![Stat::new("hp", 0)]);
    }

    #[test]
    fn test_decode_detail_requires_id() {
        assert!(decode_detail(br#"{"name": "missingno"}"#).is_err());
    }
}
