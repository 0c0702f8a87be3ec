//! Чтение и запись текстового дерева в разметку.

use std::fmt::Display;

use binobj_error::{BinobjResult, TextError};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};

use super::TextNode;

fn markup_error(
    reason: impl Display,
    position: Option<u64>,
) -> TextError {
    TextError::Markup {
        reason: reason.to_string(),
        position,
    }
}

/// Разбирает документ разметки с единственным корневым элементом.
///
/// Текст элемента, у которого есть дочерние элементы, отбрасывается: это
/// отступы форматирования. Текст листа сохраняется как есть.
pub fn read_text_tree(markup: &str) -> BinobjResult<TextNode> {
    let mut reader = Reader::from_str(markup);
    let mut stack: Vec<TextNode> = Vec::new();
    let mut root: Option<TextNode> = None;

    loop {
        let position = Some(reader.buffer_position() as u64);
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(start_node(e, position)?),
            Ok(Event::Empty(ref e)) => {
                let node = start_node(e, position)?;
                attach(&mut stack, &mut root, node, position)?;
            }
            Ok(Event::End(_)) => {
                let mut node = stack
                    .pop()
                    .ok_or_else(|| markup_error("unbalanced end tag", position))?;
                if !node.children.is_empty() {
                    node.text.clear();
                }
                attach(&mut stack, &mut root, node, position)?;
            }
            Ok(Event::Text(ref e)) => {
                if let Some(top) = stack.last_mut() {
                    let text = e.unescape().map_err(|err| markup_error(err, position))?;
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(top) = stack.last_mut() {
                    let text =
                        std::str::from_utf8(e).map_err(|err| markup_error(err, position))?;
                    top.text.push_str(text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(markup_error(e, position).into()),
        }
    }

    if let Some(open) = stack.last() {
        return Err(markup_error(format!("element <{}> is not closed", open.tag), None).into());
    }
    root.ok_or_else(|| markup_error("document has no root element", None).into())
}

fn start_node(
    e: &BytesStart<'_>,
    position: Option<u64>,
) -> Result<TextNode, TextError> {
    let tag = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| markup_error(err, position))?
        .to_string();
    let mut node = TextNode::new(tag);
    for attr in e.attributes() {
        let attr = attr.map_err(|err| markup_error(err, position))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| markup_error(err, position))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| markup_error(err, position))?
            .into_owned();
        node.attributes.push((key, value));
    }
    Ok(node)
}

fn attach(
    stack: &mut [TextNode],
    root: &mut Option<TextNode>,
    node: TextNode,
    position: Option<u64>,
) -> Result<(), TextError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(markup_error("more than one root element", position)),
    }
    Ok(())
}

/// Пишет дерево с объявлением XML и отступом в два пробела.
pub fn write_text_tree(node: &TextNode) -> BinobjResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(|e| markup_error(e, None))?;
    write_node(&mut writer, node)?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    node: &TextNode,
) -> Result<(), TextError> {
    let mut start = BytesStart::new(node.tag.as_str());
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if node.text.is_empty() && node.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| markup_error(e, None));
    }
    writer
        .write_event(Event::Start(start))
        .map_err(|e| markup_error(e, None))?;
    if !node.text.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(&node.text)))
            .map_err(|e| markup_error(e, None))?;
    }
    for child in &node.children {
        write_node(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.tag.as_str())))
        .map_err(|e| markup_error(e, None))
}
