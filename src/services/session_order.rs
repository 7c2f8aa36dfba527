use std::collections::HashSet;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum OrderError {
    #[error("problem_ids must not be empty")]
    Empty,
    #[error("Problem {0} appears more than once")]
    Duplicate(String),
    #[error("Problem {0} is not part of this session")]
    NotInSession(String),
    #[error("Problem {0} is missing from the new order")]
    Missing(String),
}

/// Checks that `requested` is a permutation of `current` and returns it as the new order.
pub(crate) fn validate_reorder(
    current: &[String],
    requested: &[String],
) -> Result<Vec<String>, OrderError> {
    if requested.is_empty() {
        return Err(OrderError::Empty);
    }

    let members: HashSet<&str> = current.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(requested.len());
    for id in requested {
        if !members.contains(id.as_str()) {
            return Err(OrderError::NotInSession(id.clone()));
        }
        if !seen.insert(id.as_str()) {
            return Err(OrderError::Duplicate(id.clone()));
        }
    }

    if let Some(missing) = current.iter().find(|id| !seen.contains(id.as_str())) {
        return Err(OrderError::Missing(missing.clone()));
    }

    Ok(requested.to_vec())
}

/// Moves `problem_id` to the end, keeping the relative order of the rest.
pub(crate) fn skip_to_end(current: &[String], problem_id: &str) -> Result<Vec<String>, OrderError> {
    let position = current
        .iter()
        .position(|id| id == problem_id)
        .ok_or_else(|| OrderError::NotInSession(problem_id.to_string()))?;

    let mut order = current.to_vec();
    let skipped = order.remove(position);
    order.push(skipped);
    Ok(order)
}

/// True when the indices are exactly `0..len` in some order.
#[cfg(test)]
pub(crate) fn is_dense(indices: &[i32]) -> bool {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.iter().enumerate().all(|(position, index)| usize::try_from(*index).ok() == Some(position))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn reorder_accepts_permutations_and_is_idempotent() {
        let current = ids(&["a", "b", "c"]);
        let first = validate_reorder(&current, &ids(&["c", "a", "b"])).expect("reorder");
        let second = validate_reorder(&first, &ids(&["c", "a", "b"])).expect("reorder");
        assert_eq!(first, second);
        assert_eq!(first, ids(&["c", "a", "b"]));
    }

    #[test]
    fn reorder_rejects_changed_membership() {
        let current = ids(&["a", "b", "c"]);
        assert_eq!(
            validate_reorder(&current, &ids(&["a", "b"])),
            Err(OrderError::Missing("c".to_string()))
        );
        assert_eq!(
            validate_reorder(&current, &ids(&["a", "b", "c", "d"])),
            Err(OrderError::NotInSession("d".to_string()))
        );
        assert_eq!(
            validate_reorder(&current, &ids(&["a", "a", "b"])),
            Err(OrderError::Duplicate("a".to_string()))
        );
        assert_eq!(validate_reorder(&current, &[]), Err(OrderError::Empty));
    }

    #[test]
    fn skip_moves_problem_to_end() {
        let current = ids(&["a", "b", "c"]);
        assert_eq!(skip_to_end(&current, "a").expect("skip"), ids(&["b", "c", "a"]));
        assert_eq!(skip_to_end(&current, "c").expect("skip"), current);
        assert_eq!(
            skip_to_end(&current, "z"),
            Err(OrderError::NotInSession("z".to_string()))
        );
    }

    #[test]
    fn density_check() {
        assert!(is_dense(&[2, 0, 1]));
        assert!(is_dense(&[]));
        assert!(!is_dense(&[0, 2]));
        assert!(!is_dense(&[0, 0, 1]));
        assert!(!is_dense(&[-1, 0]));
    }
}
