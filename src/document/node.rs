use std::fmt;

use binobj_error::{ensure, BinobjResult, StatusCode};
use indexmap::IndexMap;

/// Индекс узла в арене документа (порядок создания).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Экземпляр бинарного объекта.
///
/// Поля хранятся в порядке вставки, чтобы повторное кодирование давало тот же
/// порядок байт. Дочерние узлы задаются индексами и могут разделяться
/// несколькими родителями.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    pub(crate) hash: u32,
    pub(crate) fields: IndexMap<u32, Vec<u8>>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub fn new(hash: u32) -> Self {
        Self {
            hash,
            ..Default::default()
        }
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn fields(&self) -> &IndexMap<u32, Vec<u8>> {
        &self.fields
    }

    pub fn field(
        &self,
        hash: u32,
    ) -> Option<&[u8]> {
        self.fields.get(&hash).map(Vec::as_slice)
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Документ: арена узлов и корень.
///
/// Узлы живут столько же, сколько документ. Сравнение (`==`) структурное: два
/// документа равны, если их деревья (с раскрытыми общими поддеревьями)
/// совпадают поле в поле и ребёнок в ребёнка, независимо от порядка узлов в
/// арене.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
}

impl Document {
    /// Создаёт документ из одного корневого узла.
    pub fn new(root_hash: u32) -> Self {
        Self {
            nodes: vec![Node::new(root_hash)],
            root: NodeId(0),
        }
    }

    /// Пустая арена для декодера и импорта; корень назначается первым
    /// добавленным узлом.
    pub(crate) fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            root: NodeId(0),
        }
    }

    pub(crate) fn push_node(
        &mut self,
        node: Node,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Кол-во узлов в арене (общие узлы считаются один раз).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(
        &self,
        id: NodeId,
    ) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Узел по индексу.
    ///
    /// # Panics
    /// Если `id` получен от другого документа и выходит за пределы арены.
    pub fn node(
        &self,
        id: NodeId,
    ) -> &Node {
        &self.nodes[id.0]
    }

    /// # Panics
    /// Аналогично [`Document::node`].
    pub fn node_mut(
        &mut self,
        id: NodeId,
    ) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Добавляет новый дочерний узел в конец списка детей `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        hash: u32,
    ) -> NodeId {
        let id = self.push_node(Node::new(hash));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Делает уже существующий узел `child` ещё одним ребёнком `parent`.
    ///
    /// Отказывает, если `parent` достижим из `child`: иначе получился бы цикл.
    pub fn link_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> BinobjResult<()> {
        ensure!(
            self.get(parent).is_some() && self.get(child).is_some(),
            StatusCode::InvalidArgs,
            "node {} or {} does not belong to this document",
            parent,
            child
        );
        ensure!(
            !self.reaches(child, parent),
            StatusCode::InvalidArgs,
            "linking {} under {} would create a cycle",
            child,
            parent
        );
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Удаляет ребёнка по позиции. Сам узел остаётся в арене.
    pub fn remove_child(
        &mut self,
        parent: NodeId,
        position: usize,
    ) -> Option<NodeId> {
        let children = &mut self.nodes.get_mut(parent.0)?.children;
        (position < children.len()).then(|| children.remove(position))
    }

    /// Записывает значение поля. Существующее поле сохраняет свою позицию.
    pub fn set_field(
        &mut self,
        id: NodeId,
        hash: u32,
        bytes: Vec<u8>,
    ) -> Option<Vec<u8>> {
        self.nodes[id.0].fields.insert(hash, bytes)
    }

    pub fn remove_field(
        &mut self,
        id: NodeId,
        hash: u32,
    ) -> Option<Vec<u8>> {
        self.nodes[id.0].fields.shift_remove(&hash)
    }

    /// Обход в глубину (pre-order) с раскрытием общих поддеревьев.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            document: self,
            stack: vec![(self.root, 0)],
        }
    }

    /// Суммарное число детей и полей по всему раскрытому дереву, то есть
    /// значения для заголовка файла.
    pub fn total_counts(&self) -> (u64, u64) {
        self.walk().fold((0, 0), |(objects, values), (id, _)| {
            let node = self.node(id);
            (
                objects + node.children.len() as u64,
                values + node.fields.len() as u64,
            )
        })
    }

    fn reaches(
        &self,
        from: NodeId,
        target: NodeId,
    ) -> bool {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if std::mem::replace(&mut seen[id.0], true) {
                continue;
            }
            stack.extend(self.nodes[id.0].children.iter().copied());
        }
        false
    }
}

/// Итератор обхода: `(узел, глубина)`.
pub struct Walk<'a> {
    document: &'a Document,
    stack: Vec<(NodeId, usize)>,
}

impl Iterator for Walk<'_> {
    type Item = (NodeId, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (id, depth) = self.stack.pop()?;
        let node = self.document.get(id)?;
        self.stack
            .extend(node.children.iter().rev().map(|&c| (c, depth + 1)));
        Some((id, depth))
    }
}

impl PartialEq for Document {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        let mut stack = vec![(self.root, other.root)];
        while let Some((a, b)) = stack.pop() {
            let (Some(a), Some(b)) = (self.get(a), other.get(b)) else {
                return false;
            };
            if a.hash != b.hash
                || a.fields != b.fields
                || a.fields.keys().ne(b.fields.keys())
                || a.children.len() != b.children.len()
            {
                return false;
            }
            stack.extend(a.children.iter().copied().zip(b.children.iter().copied()));
        }
        true
    }
}

impl Eq for Document {}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut doc = Document::new(1);
        let root = doc.root();
        doc.set_field(root, 10, vec![1]);
        let a = doc.add_child(root, 2);
        doc.set_field(a, 20, vec![2, 2]);
        doc.add_child(a, 3);
        doc.add_child(root, 4);
        doc
    }

    #[test]
    fn test_walk_preorder() {
        let doc = sample();
        let order: Vec<(u32, usize)> = doc
            .walk()
            .map(|(id, depth)| (doc.node(id).hash(), depth))
            .collect();
        assert_eq!(order, vec![(1, 0), (2, 1), (3, 2), (4, 1)]);
    }

    #[test]
    fn test_total_counts_expand_shared() {
        let mut doc = sample();
        let root = doc.root();
        let shared = doc.node(root).children()[0];
        doc.link_child(root, shared).unwrap();

        // Узел 2 (с ребёнком 3 и одним полем) теперь встречается дважды.
        assert_eq!(doc.len(), 4);
        assert_eq!(doc.total_counts(), (3 + 1 + 1, 1 + 1 + 1));
    }

    #[test]
    fn test_link_child_rejects_cycles() {
        let mut doc = sample();
        let root = doc.root();
        let a = doc.node(root).children()[0];
        assert!(doc.link_child(a, root).is_err());
        assert!(doc.link_child(a, a).is_err());
    }

    #[test]
    fn test_set_field_keeps_position() {
        let mut doc = Document::new(1);
        let root = doc.root();
        doc.set_field(root, 1, vec![1]);
        doc.set_field(root, 2, vec![2]);
        let old = doc.set_field(root, 1, vec![9]);
        assert_eq!(old, Some(vec![1]));
        let keys: Vec<u32> = doc.node(root).fields().keys().copied().collect();
        assert_eq!(keys, vec![1, 2]);

        assert_eq!(doc.remove_field(root, 1), Some(vec![9]));
        assert_eq!(doc.node(root).field(1), None);
    }

    #[test]
    fn test_structural_equality_ignores_arena_order() {
        let a = sample();

        // Тот же граф, но узлы созданы в другом порядке.
        let mut b = Document::new(1);
        let root = b.root();
        b.set_field(root, 10, vec![1]);
        let late = b.push_node(Node::new(4));
        let first = b.add_child(root, 2);
        b.link_child(root, late).unwrap();
        b.set_field(first, 20, vec![2, 2]);
        b.add_child(first, 3);

        assert_eq!(a, b);

        b.set_field(first, 20, vec![2, 3]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_field_order_matters_for_equality() {
        let mut a = Document::new(1);
        a.set_field(a.root(), 1, vec![]);
        a.set_field(a.root(), 2, vec![]);
        let mut b = Document::new(1);
        b.set_field(b.root(), 2, vec![]);
        b.set_field(b.root(), 1, vec![]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_remove_child() {
        let mut doc = sample();
        let root = doc.root();
        let removed = doc.remove_child(root, 1).unwrap();
        assert_eq!(doc.node(removed).hash(), 4);
        assert_eq!(doc.node(root).children().len(), 1);
        assert_eq!(doc.remove_child(root, 5), None);
    }
}
