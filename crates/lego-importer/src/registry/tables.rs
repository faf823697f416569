//! The nine catalog table specs and their transforms

use super::coerce::{flag, int, key_int, key_text, text, text_any};
use super::{TableImportSpec, TransformedRow};
use crate::error::TransformError;
use crate::source::RawRecord;

pub(super) fn all() -> Vec<TableImportSpec> {
    vec![
        TableImportSpec {
            table: "themes",
            source_file: "themes.csv.gz",
            columns: &["id", "name", "parent_id"],
            conflict_key: &["id"],
            depends_on: &[],
            transform: themes,
        },
        TableImportSpec {
            table: "colors",
            source_file: "colors.csv.gz",
            columns: &["id", "name", "rgb", "is_trans"],
            conflict_key: &["id"],
            depends_on: &[],
            transform: colors,
        },
        TableImportSpec {
            table: "part_categories",
            source_file: "part_categories.csv.gz",
            columns: &["id", "name"],
            conflict_key: &["id"],
            depends_on: &[],
            transform: part_categories,
        },
        TableImportSpec {
            table: "parts",
            source_file: "parts.csv.gz",
            columns: &["part_num", "name", "part_cat_id", "part_url", "image_url"],
            conflict_key: &["part_num"],
            depends_on: &["part_categories"],
            transform: parts,
        },
        TableImportSpec {
            table: "sets",
            source_file: "sets.csv.gz",
            columns: &["set_num", "name", "year", "theme_id", "num_parts", "set_img_url"],
            conflict_key: &["set_num"],
            depends_on: &["themes"],
            transform: sets,
        },
        TableImportSpec {
            table: "inventories",
            source_file: "inventories.csv.gz",
            columns: &["id", "version", "set_num"],
            conflict_key: &["id"],
            depends_on: &["sets"],
            transform: inventories,
        },
        TableImportSpec {
            table: "minifigs",
            source_file: "minifigs.csv.gz",
            columns: &["fig_num", "name", "num_parts", "fig_img_url"],
            conflict_key: &["fig_num"],
            depends_on: &[],
            transform: minifigs,
        },
        TableImportSpec {
            table: "inventory_parts",
            source_file: "inventory_parts.csv.gz",
            columns: &["inventory_id", "part_num", "color_id", "quantity", "is_spare"],
            conflict_key: &["inventory_id", "part_num", "color_id", "is_spare"],
            depends_on: &["inventories", "parts", "colors"],
            transform: inventory_parts,
        },
        TableImportSpec {
            table: "inventory_minifigs",
            source_file: "inventory_minifigs.csv.gz",
            columns: &["inventory_id", "fig_num", "quantity"],
            conflict_key: &["inventory_id", "fig_num"],
            depends_on: &["inventories", "minifigs"],
            transform: inventory_minifigs,
        },
    ]
}

fn themes(r: &RawRecord) -> Result<TransformedRow, TransformError> {
    Ok(TransformedRow::new(vec![
        key_int(r, "id")?,
        text(r, "name"),
        int(r, "parent_id"),
    ]))
}

fn colors(r: &RawRecord) -> Result<TransformedRow, TransformError> {
    Ok(TransformedRow::new(vec![
        key_int(r, "id")?,
        text(r, "name"),
        text(r, "rgb"),
        flag(r, "is_trans"),
    ]))
}

fn part_categories(r: &RawRecord) -> Result<TransformedRow, TransformError> {
    Ok(TransformedRow::new(vec![key_int(r, "id")?, text(r, "name")]))
}

fn parts(r: &RawRecord) -> Result<TransformedRow, TransformError> {
    Ok(TransformedRow::new(vec![
        key_text(r, "part_num")?,
        text(r, "name"),
        int(r, "part_cat_id"),
        text(r, "part_url"),
        text(r, "part_img_url"),
    ]))
}

fn sets(r: &RawRecord) -> Result<TransformedRow, TransformError> {
    Ok(TransformedRow::new(vec![
        key_text(r, "set_num")?,
        text(r, "name"),
        int(r, "year"),
        int(r, "theme_id"),
        int(r, "num_parts"),
        text_any(r, &["img_url", "set_img_url"]),
    ]))
}

fn inventories(r: &RawRecord) -> Result<TransformedRow, TransformError> {
    Ok(TransformedRow::new(vec![
        key_int(r, "id")?,
        int(r, "version"),
        text(r, "set_num"),
    ]))
}

fn minifigs(r: &RawRecord) -> Result<TransformedRow, TransformError> {
    Ok(TransformedRow::new(vec![
        key_text(r, "fig_num")?,
        text(r, "name"),
        int(r, "num_parts"),
        text_any(r, &["img_url", "fig_img_url"]),
    ]))
}

fn inventory_parts(r: &RawRecord) -> Result<TransformedRow, TransformError> {
    Ok(TransformedRow::new(vec![
        key_int(r, "inventory_id")?,
        key_text(r, "part_num")?,
        key_int(r, "color_id")?,
        int(r, "quantity"),
        flag(r, "is_spare"),
    ]))
}

fn inventory_minifigs(r: &RawRecord) -> Result<TransformedRow, TransformError> {
    Ok(TransformedRow::new(vec![
        key_int(r, "inventory_id")?,
        key_text(r, "fig_num")?,
        int(r, "quantity"),
    ]))
}
