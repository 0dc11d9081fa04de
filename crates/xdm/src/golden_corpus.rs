#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Invariant {
    RoundTripsExactly,
    SelfMergeIsEmpty,
    IdsFollowDocumentOrder,
    EveryNodeLocatable,
    DecodesEntities,
    PreservesUtf8Text,
    HasDoctypeToken,
    HasCommentNode,
    CDataVerbatim,
    PrefixedNamesSplit,
    AttributeOwnsLeadingWhitespace,
}

impl Invariant {
    pub const fn label(self) -> &'static str {
        match self {
            Self::RoundTripsExactly => "round trips exactly",
            Self::SelfMergeIsEmpty => "self merge is empty",
            Self::IdsFollowDocumentOrder => "ids follow document order",
            Self::EveryNodeLocatable => "every node locatable",
            Self::DecodesEntities => "decodes entities",
            Self::PreservesUtf8Text => "preserves utf-8 text",
            Self::HasDoctypeToken => "has doctype token",
            Self::HasCommentNode => "has comment node",
            Self::CDataVerbatim => "cdata verbatim",
            Self::PrefixedNamesSplit => "prefixed names split",
            Self::AttributeOwnsLeadingWhitespace => "attribute owns leading whitespace",
        }
    }
}

impl std::fmt::Display for Invariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Expectation {
    MustPass,
    AllowedToFail { allowed: &'static [AllowedFailure] },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AllowedFailure {
    pub invariant: Invariant,
    pub reason: &'static str,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum FixtureKind {
    Prolog,
    Utf8,
    Entity,
    Attribute,
    Comment,
    CData,
    Namespace,
    Whitespace,
}

#[derive(Clone, Copy, Debug)]
pub struct GoldenFixture {
    pub name: &'static str,
    pub input: &'static str,
    pub covers: &'static str,
    pub tags: &'static [&'static str],
    pub invariants: &'static [Invariant],
    /// Decoded character data of the whole document (CDATA included).
    pub decoded: Option<&'static str>,
    pub expectation: Expectation,
    pub kind: FixtureKind,
}

const GOLDEN_CORPUS_V1: &[GoldenFixture] = &[
    GoldenFixture {
        name: "prolog_full",
        input: "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE r SYSTEM \"r.dtd\">\n<r/>\n",
        covers: "XML declaration, doctype and trailing newline survive a round trip.",
        tags: &["prolog", "xml-decl", "doctype"],
        invariants: &[
            Invariant::RoundTripsExactly,
            Invariant::HasDoctypeToken,
            Invariant::SelfMergeIsEmpty,
        ],
        decoded: None,
        expectation: Expectation::MustPass,
        kind: FixtureKind::Prolog,
    },
    GoldenFixture {
        name: "prolog_internal_subset",
        input: "<!DOCTYPE r [\n  <!ENTITY custom \"x]y\">\n]>\n<r>&custom;</r>",
        covers: "Internal subset with a bracket inside a quoted literal.",
        tags: &["prolog", "doctype", "internal-subset"],
        invariants: &[
            Invariant::RoundTripsExactly,
            Invariant::HasDoctypeToken,
            Invariant::DecodesEntities,
        ],
        decoded: Some("x]y"),
        expectation: Expectation::AllowedToFail {
            allowed: &[AllowedFailure {
                invariant: Invariant::DecodesEntities,
                reason: "entities declared in the internal subset are not expanded",
            }],
        },
        kind: FixtureKind::Prolog,
    },
    GoldenFixture {
        name: "prolog_comment_and_pi",
        input: "<!-- lead -->\n<?style href=\"a.css\"?>\n<r>x</r>\n<!-- tail -->",
        covers: "Comments and processing instructions around the root element.",
        tags: &["prolog", "comment", "pi"],
        invariants: &[
            Invariant::RoundTripsExactly,
            Invariant::HasCommentNode,
            Invariant::IdsFollowDocumentOrder,
            Invariant::EveryNodeLocatable,
        ],
        decoded: None,
        expectation: Expectation::MustPass,
        kind: FixtureKind::Prolog,
    },
    GoldenFixture {
        name: "utf8_text_and_names",
        input: "<dé attr=\"ï\">é<b>ï</b>ö</dé>",
        covers: "Non-ASCII names, attribute values and text.",
        tags: &["utf8", "text", "names"],
        invariants: &[
            Invariant::RoundTripsExactly,
            Invariant::PreservesUtf8Text,
            Invariant::EveryNodeLocatable,
        ],
        decoded: Some("éïö"),
        expectation: Expectation::MustPass,
        kind: FixtureKind::Utf8,
    },
    GoldenFixture {
        name: "utf8_literal_gt",
        input: "<r>a > b</r>",
        covers: "A literal `>` in character data stays text.",
        tags: &["utf8", "text", "literal-gt"],
        invariants: &[Invariant::RoundTripsExactly, Invariant::SelfMergeIsEmpty],
        decoded: Some("a > b"),
        expectation: Expectation::MustPass,
        kind: FixtureKind::Utf8,
    },
    GoldenFixture {
        name: "entity_predefined",
        input: "<p>Tom &amp; Jerry &lt;3 &quot;&apos;&gt;</p>",
        covers: "The five predefined entities decode; the raw tokens keep them.",
        tags: &["entity", "predefined", "text"],
        invariants: &[Invariant::RoundTripsExactly, Invariant::DecodesEntities],
        decoded: Some("Tom & Jerry <3 \"'>"),
        expectation: Expectation::MustPass,
        kind: FixtureKind::Entity,
    },
    GoldenFixture {
        name: "entity_character_references",
        input: "<p>&#123;&#x1F600;</p>",
        covers: "Decimal and hex character references.",
        tags: &["entity", "numeric", "text"],
        invariants: &[Invariant::RoundTripsExactly, Invariant::DecodesEntities],
        decoded: Some("{\u{1F600}"),
        expectation: Expectation::MustPass,
        kind: FixtureKind::Entity,
    },
    GoldenFixture {
        name: "entity_partial",
        input: "<p>Fish &am chips</p>",
        covers: "A reference without `;` remains literal.",
        tags: &["entity", "partial", "text"],
        invariants: &[Invariant::RoundTripsExactly, Invariant::DecodesEntities],
        decoded: Some("Fish &am chips"),
        expectation: Expectation::MustPass,
        kind: FixtureKind::Entity,
    },
    GoldenFixture {
        name: "attr_quote_variants",
        input: "<input value='a \"b\"' title=\"c 'd'\"/>",
        covers: "Single and double quoted attribute values.",
        tags: &["attribute", "quoted"],
        invariants: &[
            Invariant::RoundTripsExactly,
            Invariant::AttributeOwnsLeadingWhitespace,
            Invariant::SelfMergeIsEmpty,
        ],
        decoded: None,
        expectation: Expectation::MustPass,
        kind: FixtureKind::Attribute,
    },
    GoldenFixture {
        name: "attr_whitespace_variations",
        input: "<div\n   id =  \"a\"\tclass='foo'  >ok</div  >",
        covers: "Whitespace around `=` and before `>` in start and end tags.",
        tags: &["attribute", "whitespace", "spacing"],
        invariants: &[
            Invariant::RoundTripsExactly,
            Invariant::AttributeOwnsLeadingWhitespace,
            Invariant::EveryNodeLocatable,
        ],
        decoded: None,
        expectation: Expectation::MustPass,
        kind: FixtureKind::Attribute,
    },
    GoldenFixture {
        name: "attr_empty_value",
        input: "<r data-empty=\"\" other=''/>",
        covers: "Empty attribute values.",
        tags: &["attribute", "empty"],
        invariants: &[Invariant::RoundTripsExactly, Invariant::SelfMergeIsEmpty],
        decoded: None,
        expectation: Expectation::MustPass,
        kind: FixtureKind::Attribute,
    },
    GoldenFixture {
        name: "comment_inside_root",
        input: "<r>text<!--x-->tail</r>",
        covers: "Comment between two text runs.",
        tags: &["comment", "text"],
        invariants: &[
            Invariant::RoundTripsExactly,
            Invariant::HasCommentNode,
            Invariant::EveryNodeLocatable,
        ],
        decoded: Some("texttail"),
        expectation: Expectation::MustPass,
        kind: FixtureKind::Comment,
    },
    GoldenFixture {
        name: "cdata_markup",
        input: "<r><![CDATA[<a> & ]] ]]></r>",
        covers: "CDATA content is kept verbatim and never decoded.",
        tags: &["cdata", "markup"],
        invariants: &[Invariant::RoundTripsExactly, Invariant::CDataVerbatim],
        decoded: Some("<a> & ]] "),
        expectation: Expectation::MustPass,
        kind: FixtureKind::CData,
    },
    GoldenFixture {
        name: "namespace_prefixed",
        input: "<svg:svg xmlns:svg=\"http://www.w3.org/2000/svg\"><svg:rect svg:w=\"1\"/></svg:svg>",
        covers: "Prefixed element and attribute names.",
        tags: &["namespace", "prefix"],
        invariants: &[
            Invariant::RoundTripsExactly,
            Invariant::PrefixedNamesSplit,
            Invariant::SelfMergeIsEmpty,
        ],
        decoded: None,
        expectation: Expectation::MustPass,
        kind: FixtureKind::Namespace,
    },
    GoldenFixture {
        name: "whitespace_indented_tree",
        input: "<r>\n  <a/>\n  <b>\n    <c/>\n  </b>\n</r>\n",
        covers: "Indentation runs owned by preceding siblings or the parent.",
        tags: &["whitespace", "indentation"],
        invariants: &[
            Invariant::RoundTripsExactly,
            Invariant::IdsFollowDocumentOrder,
            Invariant::EveryNodeLocatable,
            Invariant::SelfMergeIsEmpty,
        ],
        decoded: None,
        expectation: Expectation::MustPass,
        kind: FixtureKind::Whitespace,
    },
];

pub fn fixtures() -> &'static [GoldenFixture] {
    GOLDEN_CORPUS_V1
}

#[cfg(test)]
mod tests {
    use super::{AllowedFailure, Expectation, FixtureKind, GoldenFixture, Invariant, fixtures};
    use crate::config::MergeConfig;
    use crate::flush::flush;
    use crate::merge::merge;
    use crate::position::{containing_node, find_position};
    use crate::tokenizer::tokenize;
    use crate::traverse::{Visitor, walk_document, walk_element};
    use crate::types::{Attribute, Document, Element, NodeRef, Text, TextKind, TokenKind};
    use crate::parse;
    use std::collections::HashSet;
    use std::ops::ControlFlow;

    #[test]
    fn golden_corpus_has_metadata() {
        let corpus = fixtures();
        assert!(!corpus.is_empty(), "expected at least one golden fixture");
        let mut names: HashSet<&'static str> = HashSet::new();
        let mut kind_invariants = HashSet::new();
        for &GoldenFixture {
            name,
            input,
            covers,
            tags,
            invariants,
            decoded,
            expectation,
            kind,
        } in corpus
        {
            assert!(!name.trim().is_empty(), "fixture name must be non-empty");
            assert!(!input.trim().is_empty(), "fixture input must be non-empty");
            assert!(!covers.trim().is_empty(), "fixture covers must be non-empty");
            assert!(!tags.is_empty(), "fixture tags must be non-empty: {name}");
            assert!(names.insert(name), "fixture name must be unique: {name}");
            assert!(
                !invariants.is_empty(),
                "fixture invariants must be non-empty: {name}"
            );
            let mut inv_set = HashSet::new();
            for inv in invariants.iter().copied() {
                assert!(
                    inv_set.insert(inv),
                    "duplicate invariant on fixture: {name}: {inv}"
                );
            }
            let needs_decoded = invariants.iter().any(|inv| {
                matches!(
                    inv,
                    Invariant::DecodesEntities | Invariant::PreservesUtf8Text | Invariant::CDataVerbatim
                )
            });
            assert!(
                !needs_decoded || decoded.is_some(),
                "fixture must declare its decoded text: {name}"
            );
            assert!(
                unique_kind_invariants(kind, invariants, tags, &mut kind_invariants),
                "fixture kind+invariants+tags must be unique: {name}"
            );
            validate_allowed(expectation, invariants, name);
        }
    }

    fn unique_kind_invariants(
        kind: FixtureKind,
        invariants: &[Invariant],
        tags: &[&'static str],
        seen: &mut HashSet<(FixtureKind, Vec<Invariant>, Vec<&'static str>)>,
    ) -> bool {
        let mut invs = invariants.to_vec();
        invs.sort_unstable();
        let mut tag_list = tags.to_vec();
        tag_list.sort_unstable();
        seen.insert((kind, invs, tag_list))
    }

    fn validate_allowed(expectation: Expectation, invariants: &[Invariant], name: &str) {
        if let Expectation::AllowedToFail { allowed } = expectation {
            assert!(
                !allowed.is_empty(),
                "fixture allowed-to-fail must declare allowed invariants: {name}"
            );
            for AllowedFailure { invariant, reason } in allowed {
                assert!(
                    !reason.trim().is_empty(),
                    "fixture allowed-to-fail must have a reason: {name}"
                );
                assert!(
                    invariants.contains(invariant),
                    "allowed invariant must be listed on fixture: {name}"
                );
            }
        }
    }

    #[test]
    fn golden_corpus_v1_holds_its_invariants() {
        let strict_xpass = std::env::var("XDM_STRICT_XPASS").is_ok();
        let mut failures = Vec::new();
        for fixture in fixtures() {
            let tags_label = format!("[{}]", fixture.tags.join(","));
            let doc = match parse(fixture.input) {
                Ok(doc) => doc,
                Err(err) => {
                    failures.push(format!("{} {tags_label} :: parse failed: {err}", fixture.name));
                    continue;
                }
            };
            for &inv in fixture.invariants {
                match (check_invariant(fixture, inv, &doc), is_allowed_to_fail(fixture, inv)) {
                    (Ok(()), Some(reason)) if strict_xpass => failures.push(format!(
                        "{} {tags_label} :: {inv} :: XPASS (allowed to fail: {reason})",
                        fixture.name
                    )),
                    (Ok(()), Some(reason)) => {
                        eprintln!("XPASS: {} {tags_label} :: {inv} :: {reason}", fixture.name);
                    }
                    (Ok(()), None) | (Err(_), Some(_)) => {}
                    (Err(message), None) => {
                        failures.push(format!("{} {tags_label} :: {inv} :: {message}", fixture.name));
                    }
                }
            }
        }
        if !failures.is_empty() {
            let report = failures.join("\n");
            panic!("golden corpus failures:\n{report}");
        }
    }

    fn is_allowed_to_fail(fixture: &GoldenFixture, invariant: Invariant) -> Option<&'static str> {
        match fixture.expectation {
            Expectation::MustPass => None,
            Expectation::AllowedToFail { allowed } => allowed
                .iter()
                .find(|entry| entry.invariant == invariant)
                .map(|entry| entry.reason),
        }
    }

    #[derive(Default)]
    struct Collect<'a> {
        nodes: Vec<NodeRef<'a>>,
    }

    impl<'a> Visitor<'a> for Collect<'a> {
        fn visit_document(&mut self, document: &'a Document) -> ControlFlow<()> {
            self.nodes.push(NodeRef::Document(document));
            walk_document(self, document)
        }

        fn visit_element(&mut self, element: &'a Element) -> ControlFlow<()> {
            self.nodes.push(NodeRef::Element(element));
            walk_element(self, element)
        }

        fn visit_attribute(&mut self, attribute: &'a Attribute) -> ControlFlow<()> {
            self.nodes.push(NodeRef::Attribute(attribute));
            ControlFlow::Continue(())
        }

        fn visit_text(&mut self, text: &'a Text) -> ControlFlow<()> {
            self.nodes.push(NodeRef::Text(text));
            ControlFlow::Continue(())
        }
    }

    fn collect(doc: &Document) -> Vec<NodeRef<'_>> {
        let mut collect = Collect::default();
        let _ = doc.accept(&mut collect);
        collect.nodes
    }

    fn decoded_character_data(doc: &Document) -> String {
        collect(doc)
            .into_iter()
            .filter_map(|node| match node {
                NodeRef::Text(text) if matches!(text.kind(), TextKind::Plain | TextKind::CData) => {
                    Some(text.decoded_text().into_owned())
                }
                _ => None,
            })
            .collect()
    }

    fn check_invariant(fixture: &GoldenFixture, invariant: Invariant, doc: &Document) -> Result<(), String> {
        let ensure = |ok: bool, message: &str| if ok { Ok(()) } else { Err(message.to_string()) };
        match invariant {
            Invariant::RoundTripsExactly => {
                let text = flush(doc);
                ensure(text == fixture.input, &format!("flushed {text:?}"))
            }
            Invariant::SelfMergeIsEmpty => {
                let other = parse(fixture.input).map_err(|err| err.to_string())?;
                let patches = merge(doc, &other, &MergeConfig::default());
                ensure(patches.is_empty(), &format!("{} patches", patches.len()))
            }
            Invariant::IdsFollowDocumentOrder => {
                let ids: Vec<_> = collect(doc).iter().map(|node| node.id().0).collect();
                ensure(
                    ids.windows(2).all(|pair| pair[0] < pair[1]),
                    &format!("ids {ids:?}"),
                )
            }
            Invariant::EveryNodeLocatable => {
                for node in collect(doc) {
                    let offset = find_position(doc, node.id()).ok_or_else(|| format!("{node} has no position"))?;
                    let hit = containing_node(doc, offset).ok_or_else(|| format!("nothing at {offset}"))?;
                    if matches!(node, NodeRef::Document(_)) && !matches!(hit, NodeRef::Document(_)) {
                        continue;
                    }
                    if !hit.is_same(node) {
                        return Err(format!("{node} at {offset} resolved to {hit}"));
                    }
                }
                Ok(())
            }
            Invariant::DecodesEntities => {
                let decoded = decoded_character_data(doc);
                ensure(
                    Some(decoded.as_str()) == fixture.decoded,
                    &format!("decoded {decoded:?}"),
                )
            }
            Invariant::PreservesUtf8Text => {
                let decoded = decoded_character_data(doc);
                ensure(
                    Some(decoded.as_str()) == fixture.decoded && flush(doc) == fixture.input,
                    &format!("text {decoded:?}"),
                )
            }
            Invariant::HasDoctypeToken => {
                let stream = tokenize(&flush(doc)).map_err(|err| err.to_string())?;
                ensure(
                    stream
                        .tokens()
                        .iter()
                        .any(|(token, _)| token.kind == TokenKind::Doctype),
                    "expected doctype token",
                )
            }
            Invariant::HasCommentNode => ensure(
                collect(doc).iter().any(|node| node.kind_label() == "comment"),
                "expected comment node",
            ),
            Invariant::CDataVerbatim => {
                let cdata = collect(doc).into_iter().find_map(|node| match node {
                    NodeRef::Text(text) if text.kind() == TextKind::CData => Some(text),
                    _ => None,
                });
                let cdata = cdata.ok_or("expected cdata node")?;
                ensure(
                    Some(cdata.decoded_text().as_ref()) == fixture.decoded,
                    &format!("cdata {:?}", cdata.text()),
                )
            }
            Invariant::PrefixedNamesSplit => {
                for node in collect(doc) {
                    let (name, prefix, local) = match node {
                        NodeRef::Element(element) => {
                            (element.qualified_name().into_owned(), element.prefix(), element.local_name())
                        }
                        NodeRef::Attribute(attribute) => {
                            (attribute.name().to_string(), attribute.prefix(), attribute.local_name())
                        }
                        _ => continue,
                    };
                    let rebuilt = match prefix {
                        Some(prefix) => format!("{prefix}:{local}"),
                        None => local.to_string(),
                    };
                    if rebuilt != name || local.contains(':') {
                        return Err(format!("{name} split as {prefix:?} / {local}"));
                    }
                }
                ensure(
                    doc.root_element().and_then(Element::prefix) == Some("svg"),
                    "root element should carry a prefix",
                )
            }
            Invariant::AttributeOwnsLeadingWhitespace => {
                for node in collect(doc) {
                    if let NodeRef::Attribute(attribute) = node {
                        let first = attribute.tokens().first().map(|token| token.kind);
                        if first != Some(TokenKind::Whitespace) {
                            return Err(format!("{} starts with {first:?}", attribute.name()));
                        }
                    }
                }
                Ok(())
            }
        }
    }
}
