//! JavaScript code generation for the CDP driver
//!
//! Elements found through the CDP driver are tagged with a `data-kuma-ref` attribute; every
//! later operation resolves the element through that attribute, so a replaced document makes
//! the reference stale instead of silently pointing at a different node.

use super::locator::Locator;

/// Attribute carrying element references
pub const REF_ATTR: &str = "data-kuma-ref";

/// Quote a string as a JavaScript string literal
pub fn js_string(s: &str) -> String {
    // JSON string syntax is a subset of JavaScript string syntax.
    serde_json::Value::String(s.to_string()).to_string()
}

/// Expression resolving an element reference (null when absent)
fn resolve_ref(reference: &str) -> String {
    format!(
        "document.querySelector({})",
        js_string(&format!("[{}=\"{}\"]", REF_ATTR, reference))
    )
}

/// Expression producing an array of elements matching `locator` below `scope`
fn query_all(locator: &Locator, scope: &str) -> String {
    match locator.as_css() {
        Some(selector) => format!("Array.from({}.querySelectorAll({}))", scope, js_string(&selector)),
        None => {
            let xpath = match locator {
                Locator::XPath(x) => x.as_str(),
                _ => "",
            };
            format!(
                "(() => {{ const snap = document.evaluate({}, {}, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 const out = []; for (let i = 0; i < snap.snapshotLength; i++) {{ out.push(snap.snapshotItem(i)); }} return out; }})()",
                js_string(xpath),
                scope
            )
        }
    }
}

/// Script that finds and tags elements, returning `{"ok": [refs]}` or `{"stale": true}`
///
/// `scope_ref` restricts the lookup to descendants of a previously found element.
pub fn find_elements(locator: &Locator, scope_ref: Option<&str>, prefix: &str) -> String {
    let scope = match scope_ref {
        Some(reference) => resolve_ref(reference),
        None => "document".to_string(),
    };

    format!(
        r#"(() => {{
    const scope = {scope};
    if (!scope) return JSON.stringify({{ stale: true }});
    const found = {query};
    const refs = found.map((el, i) => {{
        if (!el.hasAttribute({attr})) el.setAttribute({attr}, {prefix} + '-' + i);
        return el.getAttribute({attr});
    }});
    return JSON.stringify({{ ok: refs }});
}})()"#,
        scope = scope,
        query = query_all(locator, "scope"),
        attr = js_string(REF_ATTR),
        prefix = js_string(prefix),
    )
}

/// Script that runs `body` with the referenced element bound to `el`
///
/// `body` is a function body; its return value is reported as `{"ok": value}`.
pub fn on_element(reference: &str, body: &str) -> String {
    format!(
        r#"(() => {{
    const el = {resolve};
    if (!el) return JSON.stringify({{ stale: true }});
    const result = (() => {{ {body} }})();
    return JSON.stringify({{ ok: result === undefined ? null : result }});
}})()"#,
        resolve = resolve_ref(reference),
        body = body,
    )
}

pub const TAG_NAME: &str = "return el.tagName.toLowerCase();";

pub const TEXT: &str = "return el.innerText;";

pub const VALUE: &str = "return 'value' in el ? String(el.value) : (el.getAttribute('value') || '');";

pub const IS_DISPLAYED: &str = "const style = window.getComputedStyle(el); \
     return style.display !== 'none' && style.visibility !== 'hidden' && el.getClientRects().length > 0;";

pub const IS_SELECTED: &str = "return !!(el.checked || el.selected);";

pub const RECT: &str = "const r = el.getBoundingClientRect(); \
     return { x: r.x + window.scrollX, y: r.y + window.scrollY, width: r.width, height: r.height };";

/// Viewport coordinates of the element centre after scrolling it into view
pub const CLICK_POINT: &str = "el.scrollIntoView({ block: 'center', inline: 'center' }); \
     const r = el.getBoundingClientRect(); return { x: r.x + r.width / 2, y: r.y + r.height / 2 };";

pub const CLEAR: &str = "el.focus(); el.value = ''; \
     el.dispatchEvent(new Event('input', { bubbles: true })); \
     el.dispatchEvent(new Event('change', { bubbles: true })); return true;";

pub const SUBMIT: &str = "const form = el.tagName === 'FORM' ? el : (el.form || el.closest('form')); \
     if (!form) return false; \
     if (form.requestSubmit) { form.requestSubmit(); } else { form.submit(); } return true;";

pub const FOCUS: &str = "el.focus(); return document.activeElement === el;";

/// Body reading one attribute
pub fn attribute(name: &str) -> String {
    format!("return el.getAttribute({});", js_string(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string(r#"it's "css""#), r#""it's \"css\"""#);
    }

    #[test]
    fn test_find_elements_uses_css_for_id() {
        let script = find_elements(&Locator::id("main-q"), None, "abc");
        assert!(script.contains(r##"document.querySelectorAll("#main-q")"##) || script.contains(r##"scope.querySelectorAll("#main-q")"##));
        assert!(script.contains("\"abc\""));
    }

    #[test]
    fn test_find_elements_scoped() {
        let script = find_elements(&Locator::css("a"), Some("p-1"), "q");
        assert!(script.contains(r#"[data-kuma-ref=\"p-1\"]"#));
    }

    #[test]
    fn test_xpath_uses_snapshot() {
        let script = find_elements(&Locator::xpath("//h4/a"), None, "x");
        assert!(script.contains("ORDERED_NODE_SNAPSHOT_TYPE"));
        assert!(script.contains("\"//h4/a\""));
    }

    #[test]
    fn test_on_element_wraps_body() {
        let script = on_element("r-0", TEXT);
        assert!(script.contains("return el.innerText;"));
        assert!(script.contains("stale: true"));
    }
}
