//! # Opt-in structural inspection.
//!
//! Result types declare which of their directly held members are observable by
//! implementing [`Inspect`]. No reflection or visibility bypass is involved: the type
//! itself hands its members to a [`Members`] collector.
//!
//! ## Rules
//! - One level deep: the scanner records what `inspect` reports and never descends
//!   into the recorded members.
//! - A member whose accessor fails or panics is skipped and recorded as an
//!   [`AccessError`]; the remaining members are still collected.

use std::borrow::Cow;
use std::fmt::Display;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::error::{AccessError, panic_message};
use crate::observable::{Observable, ObservableRef};

use super::dependency::DependencyEntry;

/// # Declares the observable members of a value.
///
/// # Example
/// ```
/// use datavisor::{Inspect, Members, ObservableSlot, Trigger, scan};
///
/// struct Profile {
///     name: String,
///     visits: ObservableSlot<u32>,
///     dirty: Trigger,
/// }
///
/// impl Inspect for Profile {
///     fn inspect(&self, members: &mut Members) {
///         members.observe("visits", &self.visits).observe("dirty", &self.dirty);
///     }
/// }
///
/// let p = Profile { name: "x".into(), visits: ObservableSlot::new(), dirty: Trigger::new() };
/// let found = scan(&p);
/// assert_eq!(found.members().collect::<Vec<_>>(), ["visits", "dirty"]);
/// ```
pub trait Inspect {
    /// Reports every directly held observable member to `members`.
    ///
    /// The default reports nothing, for types without observable members.
    fn inspect(&self, members: &mut Members) {
        let _ = members;
    }
}

impl<T: Inspect + ?Sized> Inspect for Arc<T> {
    fn inspect(&self, members: &mut Members) {
        (**self).inspect(members);
    }
}

impl<T: Inspect + ?Sized> Inspect for Box<T> {
    fn inspect(&self, members: &mut Members) {
        (**self).inspect(members);
    }
}

/// Collector handed to [`Inspect::inspect`].
#[derive(Default)]
pub struct Members {
    pub(super) entries: Vec<DependencyEntry>,
    pub(super) skipped: Vec<AccessError>,
}

impl Members {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records an always-accessible observable member.
    pub fn observe<O>(&mut self, name: impl Into<Cow<'static, str>>, member: &O) -> &mut Self
    where
        O: Observable + Clone,
    {
        self.observe_ref(name, Arc::new(member.clone()))
    }

    /// Records an already shared observable member.
    pub fn observe_ref(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        member: ObservableRef,
    ) -> &mut Self {
        self.entries.push(DependencyEntry {
            member: name.into(),
            observable: member,
        });
        self
    }

    /// Records an optional member; `None` is skipped silently.
    pub fn observe_opt<O>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        member: Option<&O>,
    ) -> &mut Self
    where
        O: Observable + Clone,
    {
        match member {
            Some(m) => self.observe(name, m),
            None => self,
        }
    }

    /// Records a member whose access may fail.
    ///
    /// An `Err` or a panic inside `access` skips the member and records an
    /// [`AccessError`]; scanning continues either way.
    pub fn observe_with<O, E, F>(&mut self, name: impl Into<Cow<'static, str>>, access: F) -> &mut Self
    where
        O: Observable,
        E: Display,
        F: FnOnce() -> Result<O, E>,
    {
        let member = name.into();
        match catch_unwind(AssertUnwindSafe(access)) {
            Ok(Ok(observable)) => self.observe_ref(member, Arc::new(observable)),
            Ok(Err(e)) => {
                self.skipped.push(AccessError {
                    member,
                    reason: e.to_string(),
                });
                self
            }
            Err(payload) => {
                self.skipped.push(AccessError {
                    member,
                    reason: format!("panicked: {}", panic_message(payload.as_ref())),
                });
                self
            }
        }
    }

    /// Number of members recorded so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
