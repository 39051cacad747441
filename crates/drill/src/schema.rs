//! Header-driven column lookup with priority fallback.

use serde::Serialize;

/// One way of locating a field's column in a detail header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPredicate {
    /// First header cell containing this text, case-insensitively.
    HeaderContains(String),
    /// A fixed column, regardless of the header.
    Fixed(usize),
}

impl ColumnPredicate {
    pub fn locate(&self, header: &[String]) -> Option<usize> {
        match self {
            Self::HeaderContains(name) => {
                let needle = name.to_lowercase();
                header.iter().position(|h| h.to_lowercase().contains(&needle))
            }
            Self::Fixed(col) => Some(*col),
        }
    }
}

/// A logical field and its candidate predicates in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChain {
    pub name: String,
    pub predicates: Vec<ColumnPredicate>,
}

impl FieldChain {
    pub fn new(name: impl Into<String>, candidates: &[&str]) -> Self {
        Self {
            name: name.into(),
            predicates: candidates
                .iter()
                .map(|c| ColumnPredicate::HeaderContains(c.to_string()))
                .collect(),
        }
    }

    pub fn with_fallback_column(mut self, col: usize) -> Self {
        self.predicates.push(ColumnPredicate::Fixed(col));
        self
    }

    /// First predicate that locates a column wins; later ones are not consulted.
    pub fn resolve(&self, header: &[String]) -> Option<usize> {
        first_match(&self.predicates, |p| p.locate(header))
    }
}

/// Evaluate candidates in order and stop at the first hit.
pub fn first_match<'a, T, U>(
    candidates: impl IntoIterator<Item = &'a T>,
    probe: impl FnMut(&'a T) -> Option<U>,
) -> Option<U>
where
    T: 'a,
{
    candidates.into_iter().find_map(probe)
}

/// Column of the first candidate name present in `header`.
pub fn resolve_field<S: AsRef<str>>(header: &[String], candidates: &[S]) -> Option<usize> {
    let predicates: Vec<ColumnPredicate> = candidates
        .iter()
        .map(|c| ColumnPredicate::HeaderContains(c.as_ref().to_string()))
        .collect();
    first_match(&predicates, |p| p.locate(header))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedField {
    pub name: String,
    pub column: Option<usize>,
}

/// Field name → column for one detail table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldMap {
    pub fields: Vec<ResolvedField>,
}

impl FieldMap {
    pub fn resolve(header: &[String], chains: &[FieldChain]) -> Self {
        let fields = chains
            .iter()
            .map(|chain| {
                let column = chain.resolve(header);
                match column {
                    Some(col) => log::debug!("field '{}' -> column {}", chain.name, col),
                    None => log::warn!("field '{}' not found in detail header", chain.name),
                }
                ResolvedField { name: chain.name.clone(), column }
            })
            .collect();
        Self { fields }
    }

    pub fn columns(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.fields.iter().map(|f| f.column)
    }

    pub fn max_column(&self) -> Option<usize> {
        self.columns().flatten().max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT_CHAIN: [&str; 3] = ["Primary Unit Name", "Operational Unit Name", "Operational Unit Code"];

    fn header(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn falls_back_to_last_candidate() {
        let h = header(&["Case No", "Type", "Operational Unit Code", "Date"]);
        assert_eq!(resolve_field(&h, &UNIT_CHAIN), Some(2));
    }

    #[test]
    fn earlier_candidate_wins_even_when_further_right() {
        let h = header(&["Operational Unit Code", "x", "Operational Unit Name", "PRIMARY UNIT NAME"]);
        assert_eq!(resolve_field(&h, &UNIT_CHAIN), Some(3));
    }

    #[test]
    fn substring_match_is_case_insensitive() {
        let h = header(&["id", "nama primary unit name (uker)"]);
        assert_eq!(resolve_field(&h, &UNIT_CHAIN), Some(1));
    }

    #[test]
    fn no_candidate_is_unresolved() {
        let h = header(&["Case No", "Type"]);
        assert_eq!(resolve_field(&h, &UNIT_CHAIN), None);
    }

    #[test]
    fn fixed_fallback_only_after_header_candidates() {
        let chain = FieldChain::new("Unit", &UNIT_CHAIN).with_fallback_column(18);
        assert_eq!(chain.resolve(&header(&["Operational Unit Name"])), Some(0));
        assert_eq!(chain.resolve(&header(&["Case No"])), Some(18));
    }

    #[test]
    fn field_map_keeps_profile_order() {
        let chains = vec![
            FieldChain::new("Unit", &UNIT_CHAIN),
            FieldChain::new("Branch", &["Branch"]),
            FieldChain::new("Region", &["Region"]),
        ];
        let map = FieldMap::resolve(&header(&["Branch", "a", "b", "Operational Unit Code"]), &chains);
        let cols: Vec<_> = map.columns().collect();
        assert_eq!(cols, vec![Some(3), Some(0), None]);
        assert_eq!(map.max_column(), Some(3));
    }
}
