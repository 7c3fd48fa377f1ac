//! Rules pair a feature filter with the ordered styles used to draw what it selects.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::error::CartoucheError;
use crate::style::{lookup_style, Style, StyleKind};
use crate::SharedList;

/// Shared handle to a rule of a layer.
pub type RuleRef = Rc<Rule>;

/// A feature filter with the styles applied to the features it selects.
///
/// The filter is a query understood by the layer's data source. Styles are kept in the order
/// they were added; see [`apply_styles`](crate::style::apply_styles) for how they are used.
#[derive(Debug)]
pub struct Rule {
    filter: String,
    styles: RefCell<SharedList<Style>>,
}

impl Rule {
    /// Creates a rule without styles.
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            styles: RefCell::new(SharedList::new()),
        }
    }

    /// Filter query of the rule.
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Appends a style.
    pub fn add_style(
        &self,
        key: impl Into<String>,
        arg: impl Into<String>,
    ) -> Result<Rc<Style>, CartoucheError> {
        self.push_style(Rc::new(Style::new(key, arg)))
    }

    /// Appends an existing style. The style may be shared with other rules.
    pub fn push_style(&self, style: Rc<Style>) -> Result<Rc<Style>, CartoucheError> {
        self.styles
            .borrow_mut()
            .push(style)
            .map_err(|_| CartoucheError::Allocation("style"))
    }

    /// Styles of the rule, in insertion order.
    pub fn styles(&self) -> Ref<'_, SharedList<Style>> {
        self.styles.borrow()
    }

    /// Argument of the first style of the given kind.
    pub fn style_arg(&self, kind: StyleKind) -> Option<String> {
        lookup_style(&self.styles.borrow(), kind.key()).map(|style| style.arg().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styles_keep_order() {
        let rule = Rule::new("SELECT * FROM roads");
        rule.add_style("stroke", "#000000").unwrap();
        rule.add_style("weight", "2").unwrap();
        rule.add_style("weight", "3").unwrap();

        assert_eq!(rule.filter(), "SELECT * FROM roads");
        let keys: Vec<_> = rule.styles().iter().map(|s| s.key().to_string()).collect();
        assert_eq!(keys, ["stroke", "weight", "weight"]);
        assert_eq!(rule.style_arg(StyleKind::Weight).as_deref(), Some("2"));
        assert_eq!(rule.style_arg(StyleKind::Radius), None);
    }

    #[test]
    fn styles_are_released_with_rule() {
        let rule = Rule::new("");
        let style = rule.add_style("fill", "#ffffff").unwrap();
        assert_eq!(Rc::strong_count(&style), 2);

        drop(rule);
        assert_eq!(Rc::strong_count(&style), 1);
    }
}
