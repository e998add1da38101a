//! # Scan results.

use std::borrow::Cow;
use std::fmt;

use crate::error::AccessError;
use crate::observable::ObservableRef;

use super::inspect::{Inspect, Members};

/// One discovered observable member of a result value.
#[derive(Clone)]
pub struct DependencyEntry {
    /// Member name as reported by [`Inspect`].
    pub member: Cow<'static, str>,
    /// Handle to the member.
    pub observable: ObservableRef,
}

impl fmt::Debug for DependencyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyEntry")
            .field("member", &self.member)
            .field("listeners", &self.observable.listener_count())
            .finish()
    }
}

/// Everything one scan found: the dependencies and the members it had to skip.
#[derive(Debug, Default)]
pub struct Scan {
    entries: Vec<DependencyEntry>,
    skipped: Vec<AccessError>,
}

impl Scan {
    /// Discovered dependencies, in reporting order.
    pub fn entries(&self) -> &[DependencyEntry] {
        &self.entries
    }

    /// Members that could not be accessed.
    pub fn skipped(&self) -> &[AccessError] {
        &self.skipped
    }

    /// Names of the discovered dependencies.
    pub fn members(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.member.as_ref())
    }

    /// Number of discovered dependencies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no dependency was discovered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Splits into dependencies and skipped members.
    pub fn into_parts(self) -> (Vec<DependencyEntry>, Vec<AccessError>) {
        (self.entries, self.skipped)
    }
}

/// Collects the observable members `value` reports through [`Inspect`].
pub fn scan<T: Inspect + ?Sized>(value: &T) -> Scan {
    let mut members = Members::new();
    value.inspect(&mut members);
    Scan {
        entries: members.entries,
        skipped: members.skipped,
    }
}
