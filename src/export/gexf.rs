//! GEXF 1.2 serialization of graphs.

use crate::graph::Graph;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::Write;

const GEXF_NAMESPACE: &str = "http://www.gexf.net/1.2draft";
const GEXF_VERSION: &str = "1.2";

/// Error raised while writing XML.
#[derive(Debug, thiserror::Error)]
#[error("GEXF write failed: {0}")]
pub struct GexfError(String);

fn xml_error<E: Display>(e: E) -> GexfError {
    GexfError(e.to_string())
}

/// Writes a graph as a directed static GEXF document.
///
/// Attribute columns are declared once per class, in key order. Nodes and
/// edges are written in insertion order.
pub fn write_gexf<W: Write>(graph: &Graph, out: W) -> Result<(), GexfError> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);

    let node_ids = attribute_ids(graph.node_attribute_keys());
    let edge_ids = attribute_ids(graph.edge_attribute_keys());

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Start(
            BytesStart::new("gexf").with_attributes([("xmlns", GEXF_NAMESPACE), ("version", GEXF_VERSION)]),
        ))
        .map_err(xml_error)?;

    writer
        .write_event(Event::Start(BytesStart::new("meta")))
        .map_err(xml_error)?;
    writer
        .create_element("creator")
        .write_text_content(quick_xml::events::BytesText::new(concat!(
            "org-scraper ",
            env!("CARGO_PKG_VERSION")
        )))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("meta")))
        .map_err(xml_error)?;

    writer
        .write_event(Event::Start(BytesStart::new("graph").with_attributes([
            ("defaultedgetype", "directed"),
            ("mode", "static"),
            ("name", graph.name()),
        ])))
        .map_err(xml_error)?;

    write_attribute_declarations(&mut writer, "node", &node_ids)?;
    write_attribute_declarations(&mut writer, "edge", &edge_ids)?;

    writer
        .write_event(Event::Start(BytesStart::new("nodes")))
        .map_err(xml_error)?;
    for node in graph.nodes() {
        let start = BytesStart::new("node").with_attributes([("id", node.id.as_str()), ("label", node.id.as_str())]);
        write_element_with_values(&mut writer, start, "node", &node.attributes, &node_ids)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("nodes")))
        .map_err(xml_error)?;

    writer
        .write_event(Event::Start(BytesStart::new("edges")))
        .map_err(xml_error)?;
    for (id, edge) in graph.edges().enumerate() {
        let id = id.to_string();
        let start = BytesStart::new("edge").with_attributes([
            ("id", id.as_str()),
            ("source", edge.from),
            ("target", edge.to),
        ]);
        write_element_with_values(&mut writer, start, "edge", edge.attributes, &edge_ids)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("edges")))
        .map_err(xml_error)?;

    writer
        .write_event(Event::End(BytesEnd::new("graph")))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("gexf")))
        .map_err(xml_error)?;

    writer.into_inner().flush().map_err(xml_error)
}

fn attribute_ids<'a>(keys: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, String> {
    keys.into_iter()
        .enumerate()
        .map(|(i, key)| (key.to_string(), i.to_string()))
        .collect()
}

fn write_attribute_declarations<W: Write>(
    writer: &mut Writer<W>,
    class: &str,
    ids: &BTreeMap<String, String>,
) -> Result<(), GexfError> {
    if ids.is_empty() {
        return Ok(());
    }
    writer
        .write_event(Event::Start(
            BytesStart::new("attributes").with_attributes([("class", class), ("mode", "static")]),
        ))
        .map_err(xml_error)?;
    for (title, id) in ids {
        writer
            .write_event(Event::Empty(BytesStart::new("attribute").with_attributes([
                ("id", id.as_str()),
                ("title", title.as_str()),
                ("type", "string"),
            ])))
            .map_err(xml_error)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("attributes")))
        .map_err(xml_error)?;
    Ok(())
}

fn write_element_with_values<W: Write>(
    writer: &mut Writer<W>,
    start: BytesStart<'_>,
    name: &str,
    values: &BTreeMap<String, String>,
    ids: &BTreeMap<String, String>,
) -> Result<(), GexfError> {
    if values.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(xml_error);
    }
    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("attvalues")))
        .map_err(xml_error)?;
    for (key, value) in values {
        let Some(id) = ids.get(key) else { continue };
        writer
            .write_event(Event::Empty(
                BytesStart::new("attvalue").with_attributes([("for", id.as_str()), ("value", value.as_str())]),
            ))
            .map_err(xml_error)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("attvalues")))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_error)?;
    Ok(())
}
