//! Element selectors and their in-page query scripts.

use std::fmt;

/// How an element is located on the page.
///
/// `text/<label>` strings parse to [`Selector::Text`], mirroring the
/// puppeteer convention; anything else is treated as CSS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
	Css(String),
	/// Deepest element whose rendered text contains the label.
	Text(String),
}

impl Selector {
	pub fn css(selector: impl Into<String>) -> Self {
		Selector::Css(selector.into())
	}

	pub fn text(label: impl Into<String>) -> Self {
		Selector::Text(label.into())
	}

	pub fn parse(raw: &str) -> Self {
		match raw.strip_prefix("text/") {
			Some(label) => Selector::Text(label.to_string()),
			None => Selector::Css(raw.to_string()),
		}
	}

	/// Expression evaluating to the matched element or `null`.
	pub fn query_expression(&self) -> String {
		match self {
			Selector::Css(css) => format!("document.querySelector({})", js_string(css)),
			Selector::Text(label) => format!(
				r#"(() => {{
	const needle = {needle};
	const root = document.body || document.documentElement;
	if (!root) return null;
	const walker = document.createTreeWalker(root, NodeFilter.SHOW_ELEMENT);
	let match = null;
	for (let node = walker.currentNode; node; node = walker.nextNode()) {{
		if (node.tagName === 'SCRIPT' || node.tagName === 'STYLE') continue;
		const text = (node.innerText || '').trim();
		if (!text.includes(needle)) continue;
		if (match === null || match.contains(node)) match = node;
	}}
	return match;
}})()"#,
				needle = js_string(label)
			),
		}
	}

	/// Expression evaluating to `true` once the element exists.
	pub fn exists_expression(&self) -> String {
		format!("({}) !== null", self.query_expression())
	}

	/// Expression scrolling the element into view and returning its centre
	/// as `{x, y}`, or `null` when absent.
	pub fn center_expression(&self) -> String {
		format!(
			r#"(() => {{
	const el = {query};
	if (!el) return null;
	el.scrollIntoView({{ block: 'center', inline: 'center' }});
	const rect = el.getBoundingClientRect();
	return {{ x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 }};
}})()"#,
			query = self.query_expression()
		)
	}

	/// Expression returning the trimmed `innerText` of the element, or `null`.
	pub fn inner_text_expression(&self) -> String {
		format!(
			"(() => {{ const el = {}; return el ? (el.innerText || '').trim() : null; }})()",
			self.query_expression()
		)
	}
}

impl fmt::Display for Selector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Selector::Css(css) => f.write_str(css),
			Selector::Text(label) => write!(f, "text/{label}"),
		}
	}
}

impl From<&str> for Selector {
	fn from(raw: &str) -> Self {
		Selector::parse(raw)
	}
}

/// Encodes `value` as a JavaScript string literal.
pub(crate) fn js_string(value: &str) -> String {
	serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn text_prefix_parses_to_text_selector() {
		assert_eq!(Selector::parse("text/Whatsapp"), Selector::text("Whatsapp"));
		assert_eq!(Selector::parse(".modal"), Selector::css(".modal"));
	}

	#[test]
	fn display_round_trips_prefix() {
		assert_eq!(Selector::text("Activate").to_string(), "text/Activate");
		assert_eq!(Selector::css("pre").to_string(), "pre");
	}

	#[test]
	fn css_query_escapes_quotes() {
		let expr = Selector::css(r#"[data-open="entercard"]"#).query_expression();
		assert_eq!(expr, r#"document.querySelector("[data-open=\"entercard\"]")"#);
	}

	#[test]
	fn text_query_embeds_label_as_literal() {
		let expr = Selector::text("Cote d'Ivoire").query_expression();
		assert!(expr.contains(r#"const needle = "Cote d'Ivoire";"#));
		assert!(expr.contains("createTreeWalker"));
	}
}
