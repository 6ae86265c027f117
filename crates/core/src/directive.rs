//! Classification of template elements into directives.

use xtemplate_dom::NodeRef;

/// Every element kind the dispatcher distinguishes. Elements outside the
/// directive namespace, or with an unknown local name inside it, are `Literal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Directive {
    Template,
    Macro,
    Error,
    Doctype,
    Include,
    Set,
    If,
    Switch,
    Case,
    For,
    Call,
    Param,
    Comment,
    Copy,
    Intercept,
    Literal,
}

impl Directive {
    pub(crate) fn classify(element: &NodeRef, namespace: &str) -> Directive {
        let Some(e) = element.as_element() else {
            return Directive::Literal;
        };
        if e.namespace.as_deref() != Some(namespace) {
            return Directive::Literal;
        }
        match e.local_name.as_str() {
            "template" => Directive::Template,
            "macro" => Directive::Macro,
            "error" => Directive::Error,
            "doctype" => Directive::Doctype,
            "include" => Directive::Include,
            "set" => Directive::Set,
            "if" => Directive::If,
            "switch" => Directive::Switch,
            "case" => Directive::Case,
            "for" => Directive::For,
            "call" => Directive::Call,
            "param" => Directive::Param,
            "comment" => Directive::Comment,
            "copy" => Directive::Copy,
            "intercept" => Directive::Intercept,
            _ => Directive::Literal,
        }
    }

    /// Tag used in diagnostics, e.g. `<case>`.
    pub(crate) fn tag(self) -> &'static str {
        match self {
            Directive::Template => "<template>",
            Directive::Macro => "<macro>",
            Directive::Error => "<error>",
            Directive::Doctype => "<doctype>",
            Directive::Include => "<include>",
            Directive::Set => "<set>",
            Directive::If => "<if>",
            Directive::Switch => "<switch>",
            Directive::Case => "<case>",
            Directive::For => "<for>",
            Directive::Call => "<call>",
            Directive::Param => "<param>",
            Directive::Comment => "<comment>",
            Directive::Copy => "<copy>",
            Directive::Intercept => "<intercept>",
            Directive::Literal => "literal element",
        }
    }
}
