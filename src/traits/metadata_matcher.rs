use crate::models::metadata::PixelMetadataTable;

#[derive(Debug, Clone, Copy)]
pub enum MetadataMatch<'a> {
    Unique(&'a PixelMetadataTable),
    NotFound,
    Ambiguous(usize),
}

/// Strategy that pairs an aligned run with its pixel metadata table.
pub trait MetadataMatcher: Send + Sync {
    fn find_metadata<'a>(
        &self,
        run_name: &str,
        candidates: &'a [PixelMetadataTable],
    ) -> MetadataMatch<'a>;
}

pub(crate) fn unique_or_not<'a>(
    mut found: impl Iterator<Item = &'a PixelMetadataTable>,
) -> MetadataMatch<'a> {
    match (found.next(), found.next()) {
        (None, _) => MetadataMatch::NotFound,
        (Some(table), None) => MetadataMatch::Unique(table),
        (Some(_), Some(_)) => MetadataMatch::Ambiguous(2 + found.count()),
    }
}
