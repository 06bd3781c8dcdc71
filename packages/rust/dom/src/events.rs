//! Click dispatch for in-page navigation.

use ego_tree::NodeId;

/// Behavior registered on an element for click events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickHandler {
    /// Suppress navigation and scroll smoothly to the element whose id is the
    /// anchor's `href` without its leading `#`, if one exists at click time.
    SmoothScroll,
}

/// How the viewport moves to a scroll target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
}

/// A scroll performed in response to a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scroll {
    pub target: NodeId,
    pub behavior: ScrollBehavior,
}

/// What a dispatched click did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickOutcome {
    /// A handler suppressed the default navigation.
    pub default_prevented: bool,
    pub scroll: Option<Scroll>,
}

#[derive(Debug, Clone)]
pub(crate) struct Listener {
    pub(crate) node: NodeId,
    pub(crate) handler: ClickHandler,
}
