//! Namespace scoping and prefix renaming.
//!
//! Bindings come from `xmlns` / `xmlns:p` attributes and are inherited by
//! descendants until re-declared. `xmlns=""` removes the default namespace.
//! The `xml` prefix is always bound.
//!
//! `rename_prefix` rewrites only the affected literals (the declaration's
//! attribute name, start/end tag names, attribute names); every other token is
//! left alone, so the flushed text changes exactly where the prefix appears.

use crate::error::NamespaceError;
use crate::path::find_path;
use crate::tokenizer::is_ncname;
use crate::traverse::find_element_mut;
use crate::types::{Document, Element, Id, Node, NodeRef, TokenKind};
use std::collections::BTreeMap;

pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// In-scope prefix → URI bindings for `element`; the default namespace is under `""`.
pub fn namespace_scope(document: &Document, element: Id) -> Option<BTreeMap<String, String>> {
    let path = find_path(document, element);
    if !matches!(path.first(), Some(NodeRef::Element(_))) {
        return None;
    }
    let mut scope = BTreeMap::new();
    scope.insert("xml".to_string(), XML_NAMESPACE.to_string());
    for node in path.iter().rev() {
        let NodeRef::Element(ancestor) = node else {
            continue;
        };
        for declaration in ancestor
            .attributes()
            .iter()
            .filter_map(|attribute| attribute.namespace_declaration())
        {
            let prefix = declaration.prefix.unwrap_or("").to_string();
            if declaration.uri.is_empty() && declaration.prefix.is_none() {
                scope.remove(&prefix);
            } else {
                scope.insert(prefix, declaration.uri.to_string());
            }
        }
    }
    Some(scope)
}

/// URI bound to `prefix` (`None` for the default namespace) at `element`.
pub fn resolve_prefix(document: &Document, element: Id, prefix: Option<&str>) -> Option<String> {
    namespace_scope(document, element)?.remove(prefix.unwrap_or(""))
}

/// Namespace URI of the element's own name.
pub fn element_namespace(document: &Document, element: Id) -> Option<String> {
    let NodeRef::Element(target) = *find_path(document, element).first()? else {
        return None;
    };
    resolve_prefix(document, element, target.prefix())
}

/// Rename the `from` prefix declared on `element` to `to`, throughout its scope.
///
/// Returns how many element and attribute names were rewritten (the
/// declaration itself not included).
pub fn rename_prefix(
    document: &mut Document,
    element: Id,
    from: &str,
    to: &str,
) -> Result<usize, NamespaceError> {
    for prefix in [from, to] {
        if prefix == "xml" || prefix == "xmlns" {
            return Err(NamespaceError::ReservedPrefix(prefix.to_string()));
        }
        if !is_ncname(prefix) {
            return Err(NamespaceError::InvalidPrefix(prefix.to_string()));
        }
    }

    let target = match find_path(document, element).first() {
        Some(NodeRef::Element(target)) => *target,
        _ => return Err(NamespaceError::UnknownElement(element)),
    };
    if declares(target, from).is_none() {
        return Err(NamespaceError::UndeclaredPrefix {
            element,
            prefix: from.to_string(),
        });
    }
    if from == to {
        return Ok(0);
    }
    if declares(target, to).is_some() {
        return Err(NamespaceError::PrefixAlreadyDeclared {
            element,
            prefix: to.to_string(),
        });
    }
    check_capture(target, from, to, true)?;

    let target = find_element_mut(&mut document.children, element)
        .ok_or(NamespaceError::UnknownElement(element))?;
    if let Some(index) = declares(target, from) {
        let declaration = &mut target.attributes[index];
        declaration.name = format!("xmlns:{to}");
        for token in &mut declaration.tokens {
            if token.kind == TokenKind::AttributeName {
                token.text = declaration.name.clone();
            }
        }
    }
    let renamed = rename_in(target, from, to, true);
    log::debug!(
        target: "xdm.namespace",
        "renamed prefix {from} to {to} on {element}: {renamed} names"
    );
    Ok(renamed)
}

/// Index of the `xmlns:prefix` attribute on `element`.
fn declares(element: &Element, prefix: &str) -> Option<usize> {
    element.attributes().iter().position(|attribute| {
        attribute
            .namespace_declaration()
            .is_some_and(|declaration| declaration.prefix == Some(prefix))
    })
}

fn uses_prefix(element: &Element, prefix: &str) -> bool {
    element.prefix() == Some(prefix)
        || element
            .attributes()
            .iter()
            .any(|attribute| !attribute.is_namespace_declaration() && attribute.prefix() == Some(prefix))
}

/// Within the renamed scope, `to` must neither be re-declared (renamed names
/// would bind to it) nor already used (it would start binding to `from`'s URI).
fn check_capture(element: &Element, from: &str, to: &str, is_root: bool) -> Result<(), NamespaceError> {
    if !is_root && declares(element, from).is_some() {
        return Ok(());
    }
    if (!is_root && declares(element, to).is_some()) || uses_prefix(element, to) {
        return Err(NamespaceError::PrefixCaptured {
            element: element.id(),
            prefix: to.to_string(),
        });
    }
    for child in element.child_elements() {
        check_capture(child, from, to, false)?;
    }
    Ok(())
}

fn rename_in(element: &mut Element, from: &str, to: &str, is_root: bool) -> usize {
    if !is_root && declares(element, from).is_some() {
        return 0;
    }
    let mut renamed = 0;
    if element.prefix.as_deref() == Some(from) {
        element.prefix = Some(to.to_string());
        let local = element.local_name.clone();
        for token in &mut element.tokens {
            match token.kind {
                TokenKind::StartTag => token.text = format!("<{to}:{local}"),
                TokenKind::EndTag => token.text = format!("</{to}:{local}"),
                _ => {}
            }
        }
        renamed += 1;
    }
    for attribute in &mut element.attributes {
        if attribute.is_namespace_declaration() || attribute.prefix() != Some(from) {
            continue;
        }
        attribute.name = format!("{to}:{}", attribute.local_name());
        for token in &mut attribute.tokens {
            if token.kind == TokenKind::AttributeName {
                token.text = attribute.name.clone();
            }
        }
        renamed += 1;
    }
    for child in &mut element.children {
        if let Node::Element(child) = child {
            renamed += rename_in(child, from, to, false);
        }
    }
    renamed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flush::flush;
    use crate::parse;

    const SAMPLE: &str = concat!(
        "<root xmlns=\"urn:default\" xmlns:a=\"urn:a\">\n",
        "  <a:item a:kind=\"x\" plain=\"1\">\n",
        "    <a:leaf/>\n",
        "  </a:item>\n",
        "  <inner xmlns:a=\"urn:other\"><a:kept/></inner>\n",
        "  <reset xmlns=\"\"/>\n",
        "</root>"
    );

    fn child(element: &Element, index: usize) -> &Element {
        element.child_elements().nth(index).expect("child element")
    }

    #[test]
    fn scope_inherits_and_overrides() {
        let doc = parse(SAMPLE).expect("parse");
        let root = doc.root_element().expect("root");
        let item = child(root, 0);
        let inner = child(root, 1);
        let reset = child(root, 2);

        let scope = namespace_scope(&doc, item.id()).expect("scope");
        assert_eq!(scope.get(""), Some(&"urn:default".to_string()));
        assert_eq!(scope.get("a"), Some(&"urn:a".to_string()));
        assert_eq!(scope.get("xml"), Some(&XML_NAMESPACE.to_string()));

        assert_eq!(element_namespace(&doc, item.id()).as_deref(), Some("urn:a"));
        assert_eq!(element_namespace(&doc, child(inner, 0).id()).as_deref(), Some("urn:other"));
        assert_eq!(element_namespace(&doc, root.id()).as_deref(), Some("urn:default"));
        assert_eq!(element_namespace(&doc, reset.id()), None);
        assert_eq!(resolve_prefix(&doc, item.id(), Some("missing")), None);
        assert!(namespace_scope(&doc, root.attributes()[0].id()).is_none());
    }

    #[test]
    fn rename_rewrites_only_prefixes_in_scope() {
        let mut doc = parse(SAMPLE).expect("parse");
        let root = doc.root_element().expect("root").id();
        let renamed = rename_prefix(&mut doc, root, "a", "b").expect("rename");
        assert_eq!(renamed, 3);
        assert_eq!(
            flush(&doc),
            concat!(
                "<root xmlns=\"urn:default\" xmlns:b=\"urn:a\">\n",
                "  <b:item b:kind=\"x\" plain=\"1\">\n",
                "    <b:leaf/>\n",
                "  </b:item>\n",
                "  <inner xmlns:a=\"urn:other\"><a:kept/></inner>\n",
                "  <reset xmlns=\"\"/>\n",
                "</root>"
            )
        );
        let item = child(doc.root_element().expect("root"), 0);
        assert_eq!(item.prefix(), Some("b"));
        assert_eq!(element_namespace(&doc, item.id()).as_deref(), Some("urn:a"));
    }

    #[test]
    fn rename_rejections() {
        let mut doc = parse(SAMPLE).expect("parse");
        let root = doc.root_element().expect("root");
        let root_id = root.id();
        let item = child(root, 0).id();
        let before = flush(&doc);

        assert_eq!(
            rename_prefix(&mut doc, root_id, "xml", "b"),
            Err(NamespaceError::ReservedPrefix("xml".into()))
        );
        assert_eq!(
            rename_prefix(&mut doc, root_id, "a", "b:c"),
            Err(NamespaceError::InvalidPrefix("b:c".into()))
        );
        assert_eq!(
            rename_prefix(&mut doc, Id(999), "a", "b"),
            Err(NamespaceError::UnknownElement(Id(999)))
        );
        assert_eq!(
            rename_prefix(&mut doc, item, "a", "b"),
            Err(NamespaceError::UndeclaredPrefix {
                element: item,
                prefix: "a".into()
            })
        );
        assert_eq!(flush(&doc), before);
    }

    #[test]
    fn rename_refuses_capture() {
        let mut doc =
            parse("<r xmlns:a=\"urn:a\" xmlns:b=\"urn:b\"><a:x/></r>").expect("parse");
        let r = doc.root_element().expect("r").id();
        assert_eq!(
            rename_prefix(&mut doc, r, "a", "b"),
            Err(NamespaceError::PrefixAlreadyDeclared {
                element: r,
                prefix: "b".into()
            })
        );

        let mut doc = parse("<r xmlns:a=\"urn:a\"><s xmlns:b=\"urn:b\"><a:x/></s></r>")
            .expect("parse");
        let r = doc.root_element().expect("r");
        let (r_id, s) = (r.id(), child(r, 0).id());
        assert_eq!(
            rename_prefix(&mut doc, r_id, "a", "b"),
            Err(NamespaceError::PrefixCaptured {
                element: s,
                prefix: "b".into()
            })
        );
    }
}
