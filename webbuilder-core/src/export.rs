//! Markup and stylesheet generation.
//!
//! Two renderings of the same tree:
//!
//! - **Editor** markup carries the element id, component type and the
//!   JSON-encoded style store on every node, plus the live inline styles.
//! - **Export** markup is clean HTML; all styling lives in the generated
//!   stylesheet, which selects each element by its `id` attribute.

use crate::canvas::Canvas;
use crate::element::{Element, ElementId};
use crate::style::{Breakpoint, InteractionState, StyleMap};

/// Class the editor adds to every canvas element.
pub const EDITOR_CLASS: &str = "wb-element";

/// Class the editor adds to the selected element.
pub const SELECTED_CLASS: &str = "wb-selected";

/// Which flavor of markup to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupMode {
    /// Editor attributes and inline styles included.
    Editor,
    /// Editor-only attributes, classes and inline styles stripped.
    Export,
}

/// Options for document export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Pretty print HTML and CSS.
    pub pretty: bool,
    /// Indentation string.
    pub indent: String,
    /// Document `<title>`.
    pub title: String,
    /// Document `lang` attribute.
    pub lang: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: "  ".to_string(),
            title: "Exported Website".to_string(),
            lang: "en".to_string(),
        }
    }
}

/// One generated CSS rule block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssRule {
    /// Element the rule targets.
    pub element: ElementId,
    /// Full selector, pseudo-class included.
    pub selector: String,
    /// Interaction state of the source cell.
    pub state: InteractionState,
    /// Breakpoint of the source cell.
    pub breakpoint: Breakpoint,
    /// Declarations in property order.
    pub declarations: StyleMap,
}

impl CssRule {
    /// `@media` condition wrapping this rule, if any.
    #[must_use]
    pub fn media(&self) -> Option<String> {
        self.breakpoint.media_query()
    }

    /// Render the rule, wrapped in its media block when needed.
    #[must_use]
    pub fn to_css(&self, options: &ExportOptions) -> String {
        let mut ctx = Writer::new(options);
        match self.media() {
            Some(query) => {
                ctx.open(&format!("@media {query} {{"));
                self.write_block(&mut ctx);
                ctx.close("}");
            }
            None => self.write_block(&mut ctx),
        }
        ctx.into_output()
    }

    fn write_block(&self, ctx: &mut Writer<'_>) {
        ctx.open(&format!("{} {{", self.selector));
        for (property, value) in &self.declarations {
            ctx.add_line(&format!("{property}: {value};"));
        }
        ctx.close("}");
    }
}

/// Build the rule list for every element, depth-first, then by
/// breakpoint (widest first) and state.
#[must_use]
pub fn style_rules(canvas: &Canvas) -> Vec<CssRule> {
    let mut rules = Vec::new();
    for (_, id) in canvas.walk() {
        let Some(element) = canvas.get(id) else {
            continue;
        };
        for (state, breakpoint, cell) in element.styles.cells() {
            rules.push(CssRule {
                element: id,
                selector: format!("#{}{}", id.dom_id(), state.pseudo_class()),
                state,
                breakpoint,
                declarations: cell.clone(),
            });
        }
    }
    rules
}

/// Serialize every element's stored styles into one stylesheet.
#[must_use]
pub fn serialize_styles(canvas: &Canvas, options: &ExportOptions) -> String {
    style_rules(canvas)
        .iter()
        .map(|rule| rule.to_css(options))
        .collect::<Vec<_>>()
        .join(if options.pretty { "\n" } else { "" })
}

/// Render the canvas content (the root's children) as markup.
#[must_use]
pub fn render_markup(canvas: &Canvas, mode: MarkupMode, options: &ExportOptions) -> String {
    let mut ctx = Writer::new(options);
    for child in canvas.children(canvas.root()) {
        write_element(canvas, *child, mode, &mut ctx);
    }
    ctx.into_output()
}

/// Produce a standalone HTML document with the stylesheet embedded.
#[must_use]
pub fn export_document(canvas: &Canvas, options: &ExportOptions) -> String {
    let css = serialize_styles(canvas, options);
    let mut ctx = Writer::new(options);

    ctx.add_line("<!DOCTYPE html>");
    ctx.open(&format!("<html lang=\"{}\">", escape_html(&options.lang)));
    ctx.open("<head>");
    ctx.add_line("<meta charset=\"UTF-8\">");
    ctx.add_line("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">");
    ctx.add_line(&format!("<title>{}</title>", escape_html(&options.title)));
    ctx.open("<style>");
    // `</` would end the raw-text element early.
    for line in css.lines().filter(|l| !l.is_empty()) {
        ctx.add_line(&line.replace("</", "<\\/"));
    }
    ctx.close("</style>");
    ctx.close("</head>");

    ctx.open(&format!("<body id=\"{}\">", canvas.root().dom_id()));
    for child in canvas.children(canvas.root()) {
        write_element(canvas, *child, MarkupMode::Export, &mut ctx);
    }
    ctx.close("</body>");
    ctx.close("</html>");

    ctx.into_output()
}

/// Inline `style` attribute value for a style map.
#[must_use]
pub fn inline_style(styles: &StyleMap) -> String {
    styles
        .iter()
        .map(|(property, value)| format!("{property}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn open_tag(element: &Element, mode: MarkupMode) -> String {
    let mut tag = format!("<{} id=\"{}\"", element.tag, element.id.dom_id());

    let mut classes: Vec<&str> = Vec::new();
    if mode == MarkupMode::Editor {
        classes.push(EDITOR_CLASS);
        if element.selected {
            classes.push(SELECTED_CLASS);
        }
    }
    classes.extend(element.classes.iter().map(String::as_str));
    if !classes.is_empty() {
        tag.push_str(&format!(" class=\"{}\"", escape_html(&classes.join(" "))));
    }

    for (name, value) in &element.attributes {
        if value.is_empty() {
            tag.push_str(&format!(" {}", escape_html(name)));
        } else {
            tag.push_str(&format!(" {}=\"{}\"", escape_html(name), escape_html(value)));
        }
    }

    if let Some(media) = &element.media {
        if is_self_closing(&element.tag) || element.tag == "video" {
            tag.push_str(&format!(" src=\"{}\"", escape_html(&media.src)));
            if !media.alt.is_empty() && element.tag == "img" {
                tag.push_str(&format!(" alt=\"{}\"", escape_html(&media.alt)));
            }
        }
    }

    if mode == MarkupMode::Editor {
        tag.push_str(&format!(
            " data-element-id=\"{}\" data-component=\"{}\" data-styles=\"{}\"",
            element.id,
            escape_html(&element.component_type),
            escape_html(&element.styles.to_json()),
        ));
        if !element.applied.is_empty() {
            tag.push_str(&format!(" style=\"{}\"", escape_html(&inline_style(&element.applied))));
        }
    }

    tag.push('>');
    tag
}

fn write_element(canvas: &Canvas, id: ElementId, mode: MarkupMode, ctx: &mut Writer<'_>) {
    let Some(element) = canvas.get(id) else {
        return;
    };
    let open = open_tag(element, mode);
    if is_self_closing(&element.tag) {
        ctx.add_line(&open);
        return;
    }

    ctx.open(&open);
    if let Some(slot) = &element.text {
        let style = match mode {
            MarkupMode::Editor if !slot.applied.is_empty() => {
                format!(" style=\"{}\"", escape_html(&inline_style(&slot.applied)))
            }
            _ => String::new(),
        };
        ctx.add_line(&format!(
            "<{tag}{style}>{}</{tag}>",
            escape_html(&slot.text),
            tag = slot.tag
        ));
    }
    for child in &element.children {
        write_element(canvas, *child, mode, ctx);
    }
    ctx.close(&format!("</{}>", element.tag));
}

/// Escape text for HTML content and attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn is_self_closing(tag: &str) -> bool {
    matches!(
        tag,
        "img" | "input" | "br" | "hr" | "meta" | "link" | "source" | "embed" | "wbr"
    )
}

/// Indenting line writer shared by the HTML and CSS generators.
struct Writer<'a> {
    options: &'a ExportOptions,
    depth: usize,
    buffer: String,
}

impl<'a> Writer<'a> {
    fn new(options: &'a ExportOptions) -> Self {
        Self {
            options,
            depth: 0,
            buffer: String::new(),
        }
    }

    fn add_line(&mut self, text: &str) {
        if self.options.pretty {
            for _ in 0..self.depth {
                self.buffer.push_str(&self.options.indent);
            }
        }
        self.buffer.push_str(text);
        if self.options.pretty {
            self.buffer.push('\n');
        }
    }

    fn open(&mut self, text: &str) {
        self.add_line(text);
        self.depth += 1;
    }

    fn close(&mut self, text: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.add_line(text);
    }

    fn into_output(self) -> String {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ComponentKind, MediaKind, MediaSlot, TextSlot};

    fn canvas_with_button() -> (Canvas, ElementId) {
        let mut canvas = Canvas::default();
        let root = canvas.root();
        let mut button = Element::new(ComponentKind::Button)
            .with_text(TextSlot::new("span", "Save & exit"));
        button
            .styles
            .set(InteractionState::Base, Breakpoint::Desktop, "padding", "12px 24px");
        button
            .styles
            .set(InteractionState::Hover, Breakpoint::Mobile, "color", "red");
        button.add_class("cta");
        let id = canvas.insert(button, root, 0).unwrap();
        (canvas, id)
    }

    #[test]
    fn test_rules_are_scoped_by_breakpoint_and_state() {
        let (canvas, id) = canvas_with_button();
        let css = serialize_styles(&canvas, &ExportOptions::default());
        let dom = id.dom_id();

        assert!(css.starts_with(&format!("#{dom} {{\n  padding: 12px 24px;\n}}")));
        assert!(css.contains(&format!(
            "@media (max-width: 767px) {{\n  #{dom}:hover {{\n    color: red;\n  }}\n}}"
        )));
    }

    #[test]
    fn test_export_markup_is_clean() {
        let (mut canvas, id) = canvas_with_button();
        canvas.get_mut(id).unwrap().selected = true;
        canvas
            .get_mut(id)
            .unwrap()
            .applied
            .insert("padding".into(), "12px 24px".into());

        let html = render_markup(&canvas, MarkupMode::Export, &ExportOptions::default());
        assert!(html.contains(&format!("<button id=\"{}\" class=\"cta\">", id.dom_id())));
        assert!(html.contains("<span>Save &amp; exit</span>"));
        assert!(!html.contains("data-"));
        assert!(!html.contains(EDITOR_CLASS));
        assert!(!html.contains("style="));
    }

    #[test]
    fn test_editor_markup_carries_style_json() {
        let (canvas, id) = canvas_with_button();
        let html = render_markup(&canvas, MarkupMode::Editor, &ExportOptions::default());
        assert!(html.contains(&format!("data-element-id=\"{id}\"")));
        assert!(html.contains("data-component=\"button\""));
        assert!(html.contains("data-styles=\"{&quot;base&quot;"));
    }

    #[test]
    fn test_self_closing_media() {
        let mut canvas = Canvas::default();
        let root = canvas.root();
        let image = Element::new(ComponentKind::Image)
            .with_media(MediaSlot::new(MediaKind::Image, "a.png", "Logo"));
        let id = canvas.insert(image, root, 0).unwrap();

        let html = render_markup(&canvas, MarkupMode::Export, &ExportOptions::default());
        assert_eq!(
            html,
            format!("<img id=\"{}\" src=\"a.png\" alt=\"Logo\">\n", id.dom_id())
        );
    }

    #[test]
    fn test_export_document_embeds_stylesheet() {
        let (canvas, _) = canvas_with_button();
        let doc = export_document(&canvas, &ExportOptions::default());
        assert!(doc.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(doc.contains("<style>\n      #wb-"));
        assert!(doc.contains(&format!("<body id=\"{}\">", canvas.root().dom_id())));
        assert!(doc.trim_end().ends_with("</html>"));
    }
}
