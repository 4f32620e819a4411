//! JSON fixtures shaped like the catalog and detail endpoints.

use serde_json::json;

/// Base URL used by fixture catalogs.
pub const API_BASE: &str = "http://pokeapi.test/api/v2/pokemon";

/// Detail URL for `id`, as a catalog listing would report it.
pub fn detail_url(id: i64) -> String {
    format!("{}/{}/", API_BASE, id)
}

/// Asset URL template pointing at the fixture sprite host.
pub const ASSET_URL_TEMPLATE: &str = "http://sprites.test/artwork/{id}.png";

pub fn asset_url(id: i64) -> String {
    ASSET_URL_TEMPLATE.replace("{id}", &id.to_string())
}

/// Catalog listing for `(id, name)` pairs.
pub fn catalog_json(items: &[(i64, &str)]) -> String {
    let results: Vec<_> = items
        .iter()
        .map(|(id, name)| json!({ "name": name, "url": detail_url(*id) }))
        .collect();

    json!({
        "count": results.len(),
        "next": null,
        "previous": null,
        "results": results,
    })
    .to_string()
}

/// Detail document with the given types and `(stat, base_stat)` pairs.
pub fn detail_json(
    id: i64,
    name: &str,
    height: i32,
    weight: i32,
    types: &[&str],
    stats: &[(&str, i32)],
) -> String {
    let types: Vec<_> = types
        .iter()
        .enumerate()
        .map(|(slot, name)| json!({ "slot": slot + 1, "type": { "name": name, "url": "" } }))
        .collect();
    let stats: Vec<_> = stats
        .iter()
        .map(|(name, value)| json!({ "base_stat": value, "effort": 0, "stat": { "name": name, "url": "" } }))
        .collect();

    json!({
        "id": id,
        "name": name,
        "height": height,
        "weight": weight,
        "types": types,
        "stats": stats,
    })
    .to_string()
}

/// The six base stats of bulbasaur in source order.
pub const BULBASAUR_STATS: [(&str, i32); 6] = [
    ("hp", 45),
    ("attack", 49),
    ("defense", 49),
    ("special-attack", 65),
    ("special-defense", 65),
    ("speed", 45),
];

pub fn bulbasaur() -> String {
    detail_json(1, "bulbasaur", 7, 69, &["grass", "poison"], &BULBASAUR_STATS)
}

/// Generic detail document for `id` with a single type.
pub fn simple_detail(id: i64, name: &str) -> String {
    detail_json(id, name, 10, 100, &["normal"], &[("hp", 50)])
}

/// A PNG signature followed by a few bytes; enough to tell payloads apart.
pub fn tiny_png(id: i64) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&id.to_be_bytes());
    bytes
}
