use std::fmt;

use ego_tree::{NodeId, NodeRef, Tree};
use scraper::node::Node;
use widget_logging::{widget_debug, widget_warn};

use crate::page::{element_name, subtree_text, Page};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    /// Checkbox or radio state.
    Toggle(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(value) => write!(f, "{value}"),
            FieldValue::Toggle(true) => write!(f, "checked"),
            FieldValue::Toggle(false) => write!(f, "unchecked"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSnapshot {
    /// `form_{n}`, numbered in encounter order.
    pub label: String,
    pub fields: Vec<(String, FieldValue)>,
}

impl FormSnapshot {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, value)| value)
    }

    fn set(&mut self, name: &str, value: FieldValue) {
        match self.fields.iter_mut().find(|(field_name, _)| field_name == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentSnapshot {
    pub text: String,
    pub forms: Vec<FormSnapshot>,
}

impl ContentSnapshot {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.forms.is_empty()
    }

    /// Text sent to the analysis service: the page text followed by form data.
    pub fn render(&self) -> String {
        let mut out = self.text.clone();
        if self.forms.is_empty() {
            return out;
        }
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str("Form Data:\n");
        for (index, form) in self.forms.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(&form.label);
            out.push_str(":\n");
            for (name, value) in &form.fields {
                out.push_str(&format!("  {name}: {value}\n"));
            }
        }
        out.truncate(out.trim_end().len());
        out
    }
}

pub trait Extractor: Send + Sync {
    fn extract(&self, page: &Page, nodes: &[NodeId], exclude: Option<NodeId>) -> ContentSnapshot;
}

/// Extracts script-free text and form state from content nodes.
///
/// A node that contains the excluded subtree, or lies inside it, is skipped
/// whole. Text is read from a private copy of each node with its `<script>`
/// elements detached, so the page itself is never touched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PageContentExtractor;

impl Extractor for PageContentExtractor {
    fn extract(&self, page: &Page, nodes: &[NodeId], exclude: Option<NodeId>) -> ContentSnapshot {
        let mut blocks = Vec::new();
        let mut forms = Vec::new();
        let mut form_index = 0usize;

        for &id in nodes {
            if let Some(widget) = exclude {
                if page.contains(id, widget) || page.contains(widget, id) {
                    widget_debug!("Skipping content node {:?}: overlaps widget", id);
                    continue;
                }
            }

            let Some(mut copy) = page.detached_copy(id) else {
                widget_warn!("Skipping content node {:?}: not part of this page", id);
                continue;
            };
            strip_scripts(&mut copy);
            let text = script_free_text(&copy);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                blocks.push(trimmed.to_string());
            }

            if let Some(node) = page.node(id) {
                for form in node.descendants().filter(|n| is_tag(*n, "form")) {
                    let snapshot = snapshot_form(form, form_index);
                    form_index += 1;
                    if !snapshot.fields.is_empty() {
                        forms.push(snapshot);
                    }
                }
            }
        }

        ContentSnapshot {
            text: blocks.join("\n\n"),
            forms,
        }
    }
}

/// Convenience wrapper around [`PageContentExtractor`].
pub fn extract_content(page: &Page, nodes: &[NodeId], exclude: Option<NodeId>) -> ContentSnapshot {
    PageContentExtractor.extract(page, nodes, exclude)
}

fn is_tag(node: NodeRef<'_, Node>, tag: &str) -> bool {
    element_name(node).is_some_and(|name| name.eq_ignore_ascii_case(tag))
}

fn strip_scripts(copy: &mut Tree<Node>) {
    let scripts: Vec<NodeId> = copy
        .root()
        .descendants()
        .skip(1)
        .filter(|node| is_tag(*node, "script"))
        .map(|node| node.id())
        .collect();
    for id in scripts {
        if let Some(mut script) = copy.get_mut(id) {
            script.detach();
        }
    }
}

fn script_free_text(copy: &Tree<Node>) -> String {
    let root = copy.root();
    if is_tag(root, "script") {
        return String::new();
    }
    subtree_text(root)
}

fn snapshot_form(form: NodeRef<'_, Node>, index: usize) -> FormSnapshot {
    let mut snapshot = FormSnapshot {
        label: format!("form_{index}"),
        fields: Vec::new(),
    };

    for field in form.descendants().skip(1) {
        let Some(element) = field.value().as_element() else {
            continue;
        };
        let Some(name) = element.attr("name").filter(|name| !name.is_empty()) else {
            continue;
        };
        let value = match element.name() {
            "input" => {
                let kind = element.attr("type").unwrap_or("text").to_ascii_lowercase();
                if kind == "checkbox" || kind == "radio" {
                    FieldValue::Toggle(element.attr("checked").is_some())
                } else {
                    FieldValue::Text(element.attr("value").unwrap_or_default().to_string())
                }
            }
            "textarea" => FieldValue::Text(subtree_text(field)),
            "select" => FieldValue::Text(selected_option(field)),
            _ => continue,
        };
        snapshot.set(name, value);
    }

    snapshot
}

/// Value of the selected `<option>`, or of the first one when none is marked.
fn selected_option(select: NodeRef<'_, Node>) -> String {
    let options: Vec<NodeRef<'_, Node>> = select
        .descendants()
        .filter(|node| is_tag(*node, "option"))
        .collect();
    let chosen = options
        .iter()
        .find(|option| {
            option
                .value()
                .as_element()
                .is_some_and(|element| element.attr("selected").is_some())
        })
        .or_else(|| options.first());

    match chosen {
        Some(option) => match option.value().as_element().and_then(|e| e.attr("value")) {
            Some(value) => value.to_string(),
            None => subtree_text(*option).trim().to_string(),
        },
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn extract_selector(markup: &str, selector: &str, exclude: Option<&str>) -> ContentSnapshot {
        let page = Page::parse(markup);
        let nodes = page.select(selector).unwrap();
        let exclude = exclude.map(|s| page.select(s).unwrap()[0]);
        extract_content(&page, &nodes, exclude)
    }

    #[test]
    fn main_text_is_trimmed() {
        let snapshot = extract_selector(
            "<html><body><main>\n  Hello world  \n</main></body></html>",
            "main",
            None,
        );
        assert_eq!(snapshot.text, "Hello world");
        assert!(snapshot.forms.is_empty());
        assert_eq!(snapshot.render(), "Hello world");
    }

    #[test]
    fn scripts_never_leak_into_text() {
        let snapshot = extract_selector(
            "<body><article>Before<script>var secret = 1;</script>After\
             <div><script src=x.js>alert('x')</script></div></article></body>",
            "article",
            None,
        );
        assert_eq!(snapshot.text, "BeforeAfter");
    }

    #[test]
    fn stripping_scripts_leaves_page_untouched() {
        let page = Page::parse("<body><article>A<script>s</script></article></body>");
        let article = page.select("article").unwrap();
        let _ = extract_content(&page, &article, None);
        assert_eq!(page.select("script").unwrap().len(), 1);
    }

    #[test]
    fn blocks_join_with_blank_line_in_query_order() {
        let snapshot = extract_selector(
            "<body><p class=c> one </p><p class=c></p><p class=c>two</p></body>",
            ".c",
            None,
        );
        assert_eq!(snapshot.text, "one\n\ntwo");
    }

    #[test]
    fn widget_container_and_its_ancestors_are_skipped() {
        let markup = "<body><section id=a>Keep me</section>\
                      <section id=b>Host<div class=ai-insight-widget>AI panel\
                      <form><input name=secret value=x></form></div></section></body>";
        let snapshot = extract_selector(markup, "section", Some(".ai-insight-widget"));
        assert_eq!(snapshot.text, "Keep me");
        assert!(snapshot.forms.is_empty());

        let snapshot = extract_selector(markup, ".ai-insight-widget", Some(".ai-insight-widget"));
        assert_eq!(snapshot, ContentSnapshot::default());
    }

    #[test]
    fn forms_record_values_and_toggle_state() {
        let markup = r#"<body><main>
            <form>
              <input name="email" value="a@example.com">
              <input type="checkbox" name="subscribe" checked>
              <input type="radio" name="plan" value="pro">
              <input value="no name">
              <textarea name="notes">Call me</textarea>
              <select name="size"><option value="s">Small</option><option selected>Large</option></select>
            </form>
            <form><input type="submit"></form>
            <form><select name="color"><option value="red">Red</option></select></form>
        </main></body>"#;
        let snapshot = extract_selector(markup, "main", None);

        assert_eq!(snapshot.forms.len(), 2);
        let first = &snapshot.forms[0];
        assert_eq!(first.label, "form_0");
        assert_eq!(
            first.fields,
            vec![
                ("email".to_string(), FieldValue::Text("a@example.com".to_string())),
                ("subscribe".to_string(), FieldValue::Toggle(true)),
                ("plan".to_string(), FieldValue::Toggle(false)),
                ("notes".to_string(), FieldValue::Text("Call me".to_string())),
                ("size".to_string(), FieldValue::Text("Large".to_string())),
            ]
        );
        assert_eq!(snapshot.forms[1].label, "form_2");
        assert_eq!(
            snapshot.forms[1].field("color"),
            Some(&FieldValue::Text("red".to_string()))
        );
    }

    #[test]
    fn resolved_form_node_contributes_its_own_fields() {
        let snapshot = extract_selector(
            r#"<body><form><label>Name</label><input name="name" value="Ada"></form></body>"#,
            "form",
            None,
        );
        assert_eq!(snapshot.text, "Name");
        assert_eq!(snapshot.forms.len(), 1);
        assert_eq!(
            snapshot.render(),
            "Name\n\nForm Data:\nform_0:\n  name: Ada"
        );
    }

    #[test]
    fn repeated_field_name_keeps_first_position_and_last_value() {
        let snapshot = extract_selector(
            r#"<body><form><input type=radio name=plan checked><input name=x value=1><input type=radio name=plan></form></body>"#,
            "form",
            None,
        );
        assert_eq!(
            snapshot.forms[0].fields,
            vec![
                ("plan".to_string(), FieldValue::Toggle(false)),
                ("x".to_string(), FieldValue::Text("1".to_string())),
            ]
        );
    }

    #[test]
    fn unknown_nodes_are_skipped() {
        let page = Page::parse("<body><main>ok</main></body>");
        let other = Page::parse("<body><div><p><span><b><i>deep</i></b></span></p></div></body>");
        let foreign = other.select("i").unwrap()[0];
        let main = page.select("main").unwrap()[0];

        let snapshot = extract_content(&page, &[foreign, main], None);
        assert_eq!(snapshot.text, "ok");
    }
}
