//! Module: db::filter
//! Responsibility: per-element key filters and their construction from scan
//! boundaries.
//! Does not own: traversal (stores apply filters) or key framing.
//! Boundary: the cursor builds filters once at open and hands them to the
//! store on every traverse.


use crate::{
    db::{
        hkey::advance_to_next_prefix,
        projection::Projection,
        scan::{ScanFlags, ScanRequest, ScanTarget},
    },
    error::{InternalError, ScanError},
    schema::{GroupDef, IndexDef},
    value::{Value, element_len, encode_element, encode_open_prefix, encode_ordinal_element},
};
use std::ops::Bound;

///
/// FilterTerm
///
/// Constraint on one key element, compared as encoded bytes.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FilterTerm {
    All,
    Range {
        low: Bound<Vec<u8>>,
        high: Bound<Vec<u8>>,
    },
}

impl FilterTerm {
    /// Single-element term matching exactly `element`.
    #[must_use]
    pub fn literal(element: Vec<u8>) -> Self {
        Self::Range {
            low: Bound::Included(element.clone()),
            high: Bound::Included(element),
        }
    }

    #[must_use]
    pub fn contains(&self, element: &[u8]) -> bool {
        let Self::Range { low, high } = self else {
            return true;
        };

        let low_ok = match low {
            Bound::Unbounded => true,
            Bound::Included(boundary) => element >= boundary.as_slice(),
            Bound::Excluded(boundary) => element > boundary.as_slice(),
        };
        let high_ok = match high {
            Bound::Unbounded => true,
            Bound::Included(boundary) => element <= boundary.as_slice(),
            Bound::Excluded(boundary) => element < boundary.as_slice(),
        };

        low_ok && high_ok
    }

    /// Whether no element can satisfy this term.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let Self::Range { low, high } = self else {
            return false;
        };
        let (Some(low_key), Some(high_key)) = (bound_key(low), bound_key(high)) else {
            return false;
        };

        if low_key < high_key {
            return false;
        }
        if low_key > high_key {
            return true;
        }

        !matches!(low, Bound::Included(_)) || !matches!(high, Bound::Included(_))
    }

    fn exclude_low(&mut self) {
        if let Self::Range { low, .. } = self {
            *low = exclude(std::mem::replace(low, Bound::Unbounded));
        }
    }

    fn exclude_high(&mut self) {
        if let Self::Range { high, .. } = self {
            *high = exclude(std::mem::replace(high, Bound::Unbounded));
        }
    }
}

fn exclude(bound: Bound<Vec<u8>>) -> Bound<Vec<u8>> {
    match bound {
        Bound::Included(key) | Bound::Excluded(key) => Bound::Excluded(key),
        Bound::Unbounded => Bound::Unbounded,
    }
}

const fn bound_key(bound: &Bound<Vec<u8>>) -> Option<&Vec<u8>> {
    match bound {
        Bound::Included(key) | Bound::Excluded(key) => Some(key),
        Bound::Unbounded => None,
    }
}

///
/// KeyFilter
///
/// Selects keys whose element count lies in `[min_depth, max_depth]` and
/// whose first `terms.len()` elements each satisfy their term. Keys shorter
/// than the term list are checked only on the elements they have.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct KeyFilter {
    terms: Vec<FilterTerm>,
    min_depth: usize,
    max_depth: Option<usize>,
}

impl KeyFilter {
    #[must_use]
    pub const fn new(terms: Vec<FilterTerm>, min_depth: usize, max_depth: Option<usize>) -> Self {
        Self {
            terms,
            min_depth,
            max_depth,
        }
    }

    /// Filter selecting every key.
    #[must_use]
    pub const fn all() -> Self {
        Self::new(Vec::new(), 0, None)
    }

    #[must_use]
    pub fn terms(&self) -> &[FilterTerm] {
        &self.terms
    }

    #[must_use]
    pub const fn min_depth(&self) -> usize {
        self.min_depth
    }

    #[must_use]
    pub const fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Whether `key` is selected. Keys that do not frame as elements are
    /// never selected.
    #[must_use]
    pub fn selects(&self, key: &[u8]) -> bool {
        let mut offset = 0;
        let mut depth = 0;

        while offset < key.len() {
            let Ok(len) = element_len(&key[offset..]) else {
                return false;
            };
            if let Some(term) = self.terms.get(depth)
                && !term.contains(&key[offset..offset + len])
            {
                return false;
            }

            depth += 1;
            offset += len;
            if self.max_depth.is_some_and(|max| depth > max) {
                return false;
            }
        }

        depth >= self.min_depth
    }

    /// Whether any term rejects every element.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.iter().any(FilterTerm::is_empty)
    }
}

///
/// FilterBuilder
///
/// Builds the primary (group tree) and secondary (index) filters of one
/// scan. Counts key-encoding calls so tests can check that a bound column
/// is encoded once per side and equivalent columns are not re-evaluated.
///

pub(crate) struct FilterBuilder<'a> {
    group: &'a GroupDef,
    request: &'a ScanRequest,
    encode_calls: usize,
}

impl<'a> FilterBuilder<'a> {
    pub(crate) const fn new(group: &'a GroupDef, request: &'a ScanRequest) -> Self {
        Self {
            group,
            request,
            encode_calls: 0,
        }
    }

    pub(crate) const fn encode_calls(&self) -> usize {
        self.encode_calls
    }

    /// Filter over the group tree, one term per element of the projection's
    /// branch hkey.
    pub(crate) fn primary(
        &mut self,
        projection: &Projection,
        deep: bool,
    ) -> Result<KeyFilter, ScanError> {
        self.check_templates()?;

        let mut terms = Vec::new();
        let mut bounded = BoundedTerms::default();

        if let Some(branch) = projection.branch() {
            let table = self.group.table(branch)?;
            for segment in &table.hkey().segments {
                let mut ordinal = Vec::new();
                encode_ordinal_element(segment.ordinal.0, &mut ordinal);
                terms.push(FilterTerm::literal(ordinal));

                for column in &segment.columns {
                    let candidates = match self.request.target {
                        ScanTarget::Group => column.equivalents.as_slice(),
                        ScanTarget::Table(_) => std::slice::from_ref(&column.position),
                    };
                    let term = self.column_term(candidates, false)?;
                    bounded.track(&term, terms.len());
                    terms.push(term);
                }
            }
        }

        bounded.apply_exclusive(&mut terms, self.request.flags);

        let max_depth = (!deep).then(|| projection.max_hkey_depth().max(terms.len()));

        Ok(KeyFilter::new(terms, 0, max_depth))
    }

    /// Filter over one index's entry keys, one term per index field.
    pub(crate) fn secondary(&mut self, index: &IndexDef) -> Result<KeyFilter, ScanError> {
        self.check_templates()?;

        let fields = index.fields();
        let prefix = self.request.has(ScanFlags::PREFIX);
        let mut terms = Vec::with_capacity(fields.len());
        let mut bounded = BoundedTerms::default();

        for (depth, position) in fields.iter().enumerate() {
            let open_prefix = prefix && depth + 1 == fields.len();
            let term = self.column_term(std::slice::from_ref(position), open_prefix)?;
            bounded.track(&term, terms.len());
            terms.push(term);
        }

        if prefix {
            // the advanced prefix bound is already exclusive
            bounded.high = None;
        }
        bounded.apply_exclusive(&mut terms, self.request.flags);

        Ok(KeyFilter::new(terms, fields.len(), None))
    }

    // The first candidate bound on either side decides the term; the rest
    // are implied equal and never evaluated.
    fn column_term(
        &mut self,
        candidates: &[usize],
        open_prefix: bool,
    ) -> Result<FilterTerm, ScanError> {
        let request = self.request;
        let Some(&column) = candidates
            .iter()
            .find(|c| request.start_value(**c).is_some() || request.end_value(**c).is_some())
        else {
            return Ok(FilterTerm::All);
        };

        let low = match request.start_value(column) {
            Some(value) => Bound::Included(self.encode(value)),
            None => Bound::Unbounded,
        };
        let high = match request.end_value(column) {
            Some(value) if open_prefix => {
                let mut key = self.encode_prefix(value);
                advance_to_next_prefix(&mut key)?;
                Bound::Excluded(key)
            }
            Some(value) => Bound::Included(self.encode(value)),
            None => Bound::Unbounded,
        };

        Ok(FilterTerm::Range { low, high })
    }

    fn encode(&mut self, value: &Value) -> Vec<u8> {
        self.encode_calls += 1;
        let mut out = Vec::new();
        encode_element(value, &mut out);
        out
    }

    fn encode_prefix(&mut self, value: &Value) -> Vec<u8> {
        self.encode_calls += 1;
        let mut out = Vec::new();
        encode_open_prefix(value, &mut out);
        out
    }

    fn check_templates(&self) -> Result<(), InternalError> {
        let width = match self.request.target {
            ScanTarget::Table(id) => self.group.table(id)?.field_count(),
            ScanTarget::Group => self.group.column_count(),
        };

        for (side, template) in [("start", &self.request.start), ("end", &self.request.end)] {
            if let Some(template) = template
                && template.len() != width
            {
                return Err(InternalError::scan_invariant(format!(
                    "{side} template has {} fields, target has {width}",
                    template.len()
                )));
            }
        }

        Ok(())
    }
}

// Deepest column term bound on each side.
#[derive(Default)]
struct BoundedTerms {
    low: Option<usize>,
    high: Option<usize>,
}

impl BoundedTerms {
    fn track(&mut self, term: &FilterTerm, at: usize) {
        if let FilterTerm::Range { low, high } = term {
            if !matches!(low, Bound::Unbounded) {
                self.low = Some(at);
            }
            if !matches!(high, Bound::Unbounded) {
                self.high = Some(at);
            }
        }
    }

    fn apply_exclusive(&self, terms: &mut [FilterTerm], flags: ScanFlags) {
        if flags.contains(ScanFlags::START_EXCLUSIVE)
            && let Some(at) = self.low
        {
            terms[at].exclude_low();
        }
        if flags.contains(ScanFlags::END_EXCLUSIVE)
            && let Some(at) = self.high
        {
            terms[at].exclude_high();
        }
    }
}
