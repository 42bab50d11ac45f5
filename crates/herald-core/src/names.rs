//! Event-name resolution.
//!
//! Every public `Events` operation accepts its event name in one of three
//! shapes, all normalized here into a sequence of single-name calls:
//!
//! - a single literal name: `"change"`
//! - a whitespace-separated list: `"change:title  change:body"`
//! - a name → value mapping: `[("change", a), ("destroy", b)]`
//!
//! ```rust,ignore
//! use herald_core::names::{EventNames, ResolveOptions, resolve};
//!
//! let mut seen = Vec::new();
//! resolve(EventNames::<()>::from("a b"), None, ResolveOptions::<()>::default(), |name, _, _| {
//!     seen.push(name.to_string());
//! });
//! assert_eq!(seen, ["a", "b"]);
//! ```

use std::collections::BTreeMap;

/// An event-name argument before resolution.
///
/// `H` is the value carried alongside each name: a listener callback for
/// registration, a payload value for triggering.
#[derive(Debug, Clone, PartialEq)]
pub enum EventNames<H> {
    /// One name, or several separated by whitespace.
    Name(String),
    /// Names mapped to their own value, visited in stored order.
    Map(Vec<(String, H)>),
}

impl<H> EventNames<H> {
    /// Returns `true` if resolving these names would dispatch nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Name(name) => name.split_whitespace().next().is_none(),
            Self::Map(entries) => entries
                .iter()
                .all(|(key, _)| key.split_whitespace().next().is_none()),
        }
    }
}

impl<H> From<&str> for EventNames<H> {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl<H> From<String> for EventNames<H> {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl<H> From<&String> for EventNames<H> {
    fn from(name: &String) -> Self {
        Self::Name(name.clone())
    }
}

impl<K: Into<String>, H> From<Vec<(K, H)>> for EventNames<H> {
    fn from(entries: Vec<(K, H)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, h)| (k.into(), h)).collect())
    }
}

impl<K: Into<String>, H, const N: usize> From<[(K, H); N]> for EventNames<H> {
    fn from(entries: [(K, H); N]) -> Self {
        Self::Map(entries.into_iter().map(|(k, h)| (k.into(), h)).collect())
    }
}

impl<K: Into<String>, H> From<BTreeMap<K, H>> for EventNames<H> {
    fn from(entries: BTreeMap<K, H>) -> Self {
        Self::Map(entries.into_iter().map(|(k, h)| (k.into(), h)).collect())
    }
}

/// Options threaded through a resolution.
#[derive(Debug, Clone)]
pub struct ResolveOptions<C> {
    /// Explicit context for every resolved call.
    pub context: Option<C>,
    /// Context supplied in the handler position of a map-style call.
    ///
    /// Used for every map entry when `context` is unset.
    pub map_context: Option<C>,
}

impl<C> Default for ResolveOptions<C> {
    fn default() -> Self {
        Self {
            context: None,
            map_context: None,
        }
    }
}

impl<C> ResolveOptions<C> {
    /// Options with an explicit context.
    pub fn with_context(context: Option<C>) -> Self {
        Self {
            context,
            map_context: None,
        }
    }

    /// Options for a map-style call whose shared value doubles as context.
    pub fn with_map_context(map_context: Option<C>) -> Self {
        Self {
            context: None,
            map_context,
        }
    }
}

/// Splits a name argument into its non-empty whitespace-separated tokens.
pub(crate) fn split_names(name: &str) -> impl Iterator<Item = &str> {
    name.split_whitespace()
}

/// Resolves `names` into calls to `dispatch(name, handler, context)`.
///
/// Map entries carry their own handler; the outer `handler` is only used for
/// the plain-name form, where every token receives a clone of it. Returns the
/// number of single-name dispatches performed. Empty names dispatch nothing.
pub fn resolve<H, C, F>(
    names: EventNames<H>,
    handler: Option<H>,
    options: ResolveOptions<C>,
    mut dispatch: F,
) -> usize
where
    H: Clone,
    C: Clone,
    F: FnMut(&str, Option<H>, Option<C>),
{
    match names {
        EventNames::Map(entries) => {
            let context = options.context.or(options.map_context);
            let mut count = 0;
            for (key, value) in entries {
                count += resolve_name(&key, Some(value), context.clone(), &mut dispatch);
            }
            count
        }
        EventNames::Name(name) => resolve_name(&name, handler, options.context, &mut dispatch),
    }
}

fn resolve_name<H, C, F>(name: &str, handler: Option<H>, context: Option<C>, dispatch: &mut F) -> usize
where
    H: Clone,
    C: Clone,
    F: FnMut(&str, Option<H>, Option<C>),
{
    let mut count = 0;
    for token in split_names(name) {
        dispatch(token, handler.clone(), context.clone());
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<H: Clone>(
        names: EventNames<H>,
        handler: Option<H>,
        options: ResolveOptions<&'static str>,
    ) -> Vec<(String, Option<H>, Option<&'static str>)> {
        let mut calls = Vec::new();
        resolve(names, handler, options, |name, h, c| {
            calls.push((name.to_string(), h, c));
        });
        calls
    }

    #[test]
    fn test_single_name() {
        let calls = collect(EventNames::from("change"), Some(1), ResolveOptions::default());
        assert_eq!(calls, vec![("change".to_string(), Some(1), None)]);
    }

    #[test]
    fn test_whitespace_separated_names_in_order() {
        let calls = collect(
            EventNames::from("  a \t b\n\nc "),
            Some(7),
            ResolveOptions::with_context(Some("ctx")),
        );
        let names: Vec<_> = calls.iter().map(|(n, _, _)| n.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert!(calls.iter().all(|(_, h, c)| *h == Some(7) && *c == Some("ctx")));
    }

    #[test]
    fn test_empty_name_is_noop() {
        let mut count = 0;
        let dispatched = resolve(
            EventNames::<u8>::from(""),
            None,
            ResolveOptions::<()>::default(),
            |_, _, _| count += 1,
        );
        assert_eq!(dispatched, 0);
        assert_eq!(count, 0);

        assert!(EventNames::<u8>::from("   ").is_empty());
        assert!(EventNames::<u8>::Map(Vec::new()).is_empty());
        assert!(!EventNames::<u8>::from("a").is_empty());
    }

    #[test]
    fn test_map_dispatches_each_entry_with_its_value() {
        let calls = collect(
            EventNames::from([("a", 1), ("b c", 2)]),
            Some(99),
            ResolveOptions::default(),
        );
        assert_eq!(
            calls,
            vec![
                ("a".to_string(), Some(1), None),
                ("b".to_string(), Some(2), None),
                ("c".to_string(), Some(2), None),
            ]
        );
    }

    #[test]
    fn test_map_context_propagates_when_context_unset() {
        let calls = collect(
            EventNames::from(vec![("a", 1), ("b", 2)]),
            None,
            ResolveOptions::with_map_context(Some("shared")),
        );
        assert!(calls.iter().all(|(_, _, c)| *c == Some("shared")));

        let options = ResolveOptions {
            context: Some("explicit"),
            map_context: Some("shared"),
        };
        let calls = collect(EventNames::from(vec![("a", 1)]), None, options);
        assert_eq!(calls[0].2, Some("explicit"));
    }

    #[test]
    fn test_map_context_ignored_for_plain_names() {
        let calls = collect(
            EventNames::from("a"),
            Some(1),
            ResolveOptions::with_map_context(Some("shared")),
        );
        assert_eq!(calls[0].2, None);
    }

    #[test]
    fn test_btreemap_order_is_stable() {
        let mut map = BTreeMap::new();
        map.insert("b", 2);
        map.insert("a", 1);
        let calls = collect(EventNames::from(map), None, ResolveOptions::default());
        let names: Vec<_> = calls.iter().map(|(n, _, _)| n.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }
}
