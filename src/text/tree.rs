/// Элемент текстового дерева: тег, атрибуты в порядке записи, текст и
/// дочерние элементы.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextNode {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<TextNode>,
}

impl TextNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_text(
        mut self,
        text: impl Into<String>,
    ) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(
        mut self,
        child: TextNode,
    ) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Задаёт атрибут; существующий атрибут сохраняет свою позицию.
    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn children_named<'a>(
        &'a self,
        tag: &'a str,
    ) -> impl Iterator<Item = &'a TextNode> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    pub fn first_child(
        &self,
        tag: &str,
    ) -> Option<&TextNode> {
        self.children.iter().find(|c| c.tag == tag)
    }
}
