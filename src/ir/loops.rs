//! Loop forest handed over by the control-flow analysis.
//!
//! Loops expose their member blocks both as an ordered list (block scan
//! order) and as a set (membership tests; a block belongs to every loop
//! enclosing it, not only its innermost one). The forest links loops into
//! a nesting tree and answers the two queries the passes need: the
//! innermost loop of a block, and whether a loop has nested children.

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use super::BlockId;

/// Index into the forest's loop list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoopId(pub u32);

/// A natural loop detected by the control-flow analysis.
#[derive(Debug, Clone)]
pub struct Loop {
    pub id: LoopId,
    pub header: BlockId,
    /// Member blocks in scan order, header first.
    pub blocks: Vec<BlockId>,
    /// Blocks inside the loop with a successor outside it.
    pub exits: SmallVec<[BlockId; 2]>,
    pub parent: Option<LoopId>,
    members: HashSet<BlockId>,
}

impl Loop {
    pub fn new(
        id: LoopId,
        header: BlockId,
        blocks: Vec<BlockId>,
        exits: SmallVec<[BlockId; 2]>,
        parent: Option<LoopId>,
    ) -> Self {
        let members = blocks.iter().copied().collect();
        Self { id, header, blocks, exits, parent, members }
    }

    /// Membership test over the block set.
    pub fn contains(&self, block: BlockId) -> bool {
        self.members.contains(&block)
    }
}

/// All loops of one function, linked into a nesting tree.
#[derive(Debug, Clone, Default)]
pub struct LoopForest {
    loops: Vec<Loop>,
    roots: SmallVec<[LoopId; 2]>,
    children: Vec<SmallVec<[LoopId; 2]>>,
    depth: Vec<u32>,
    /// Deepest loop each block is a member of.
    innermost: HashMap<BlockId, LoopId>,
}

impl LoopForest {
    /// Build the forest from loops with parent links already set.
    pub fn new(loops: Vec<Loop>) -> Self {
        let n = loops.len();
        let mut roots = SmallVec::new();
        let mut children: Vec<SmallVec<[LoopId; 2]>> = vec![SmallVec::new(); n];
        for lp in &loops {
            match lp.parent {
                Some(p) => children[p.0 as usize].push(lp.id),
                None => roots.push(lp.id),
            }
        }

        let mut depth = vec![1u32; n];
        for lp in &loops {
            let mut d = 1;
            let mut cur = lp.parent;
            while let Some(p) = cur {
                d += 1;
                cur = loops[p.0 as usize].parent;
            }
            depth[lp.id.0 as usize] = d;
        }

        let mut innermost: HashMap<BlockId, LoopId> = HashMap::new();
        for lp in &loops {
            for &b in &lp.blocks {
                let replace = match innermost.get(&b) {
                    Some(&prev) => depth[lp.id.0 as usize] > depth[prev.0 as usize],
                    None => true,
                };
                if replace {
                    innermost.insert(b, lp.id);
                }
            }
        }

        Self { loops, roots, children, depth, innermost }
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    pub fn get(&self, id: LoopId) -> &Loop {
        &self.loops[id.0 as usize]
    }

    pub fn roots(&self) -> &[LoopId] {
        &self.roots
    }

    pub fn children(&self, id: LoopId) -> &[LoopId] {
        &self.children[id.0 as usize]
    }

    /// Nesting depth, 1 for outermost loops.
    pub fn depth(&self, id: LoopId) -> u32 {
        self.depth[id.0 as usize]
    }

    /// A loop is innermost when no other loop nests inside it.
    pub fn is_innermost(&self, id: LoopId) -> bool {
        self.children[id.0 as usize].is_empty()
    }

    /// Deepest loop containing the block, if any.
    pub fn innermost_for(&self, block: BlockId) -> Option<LoopId> {
        self.innermost.get(&block).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Loop> {
        self.loops.iter()
    }
}
