//! Projection of item details into persistence-ready records.

use dex_common::{ItemDetail, NormalizedRecord};

/// Asset store key for `id`.
pub fn asset_key(id: i64) -> String {
    format!("{}.png", id)
}

/// Public image path for `id`. Depends on nothing but `id` and the prefix,
/// so reruns produce identical paths.
pub fn image_path(prefix: &str, id: i64) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), asset_key(id))
}

/// Join type tags with `,` and keep stats in source order.
pub fn normalize(detail: ItemDetail, image_path_prefix: &str) -> NormalizedRecord {
    NormalizedRecord {
        id: detail.id,
        image_path: image_path(image_path_prefix, detail.id),
        name: detail.name,
        height: detail.height,
        weight: detail.weight,
        types: detail.type_tags.join(","),
        stats: detail.base_stats,
    }
}
