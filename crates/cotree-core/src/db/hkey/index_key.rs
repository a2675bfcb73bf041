use crate::{
    db::{hkey::HKey, projection::CoveredField},
    error::InternalError,
    schema::{IndexDef, TableDef},
    value::{Value, encode_element, encode_ordinal_element},
};

/// Append the entry key of a row in `index`: the index fields followed by
/// the hkey columns they do not contain.
pub fn encode_index_key(index: &IndexDef, fields: &[Value], out: &mut Vec<u8>) {
    for &position in index.key_fields() {
        encode_element(fields.get(position).unwrap_or(&Value::Null), out);
    }
}

/// Rebuild the hkey an index entry points at.
///
/// Value elements are copied byte for byte from the entry key.
pub(crate) fn rebuild_hkey(
    table: &TableDef,
    index: &IndexDef,
    entry: &HKey,
    out: &mut Vec<u8>,
) -> Result<(), InternalError> {
    out.clear();

    let mut column = 0;
    for segment in &table.hkey().segments {
        encode_ordinal_element(segment.ordinal.0, out);
        for _ in &segment.columns {
            let depth = index.hkey_map().get(column).copied().ok_or_else(|| {
                InternalError::index_invariant(format!(
                    "index '{}' maps {} hkey columns, table '{}' needs more",
                    index.name(),
                    index.hkey_map().len(),
                    table.name()
                ))
            })?;
            let element = entry.element(depth).ok_or_else(|| {
                InternalError::index_invariant(format!(
                    "index entry of depth {} has no element {depth}",
                    entry.depth()
                ))
            })?;

            out.extend_from_slice(element);
            column += 1;
        }
    }

    Ok(())
}

/// Fill the covered fields of `fields` from an index entry.
pub(crate) fn decode_covered_fields(
    covered: &[CoveredField],
    entry: &HKey,
    fields: &mut [Value],
) -> Result<(), InternalError> {
    for field in covered {
        let slot = fields.get_mut(field.field).ok_or_else(|| {
            InternalError::index_invariant(format!("covered field {} out of range", field.field))
        })?;
        *slot = entry.decode_value(field.index_depth)?;
    }

    Ok(())
}
