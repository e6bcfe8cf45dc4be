use std::collections::LinkedList;

use crate::middle::iloc::Instruction;

/// Where spliced code lands relative to the receiving list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concat {
    /// `[self.., other..]`
    Append,
    /// `[other.., self..]`
    Prepend,
}

/// An ordered sequence of instructions. Pushing at either end and splicing a
/// whole list onto either end are constant time, since code for a construct
/// is built from the already generated code of its children.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstructionList {
    instructions: LinkedList<Instruction>,
}

impl InstructionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(instruction: Instruction) -> Self {
        let mut list = Self::new();
        list.push_back(instruction);
        list
    }

    pub fn push_front(&mut self, instruction: Instruction) {
        self.instructions.push_front(instruction);
    }

    pub fn push_back(&mut self, instruction: Instruction) {
        self.instructions.push_back(instruction);
    }

    /// Moves every instruction of `other` into this list. `other` is consumed
    /// so a list can never be spliced twice.
    pub fn splice(&mut self, mut other: InstructionList, concat: Concat) {
        match concat {
            Concat::Append => self.instructions.append(&mut other.instructions),
            Concat::Prepend => {
                other.instructions.append(&mut self.instructions);
                std::mem::swap(&mut self.instructions, &mut other.instructions);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn first(&self) -> Option<&Instruction> {
        self.instructions.front()
    }

    pub fn last(&self) -> Option<&Instruction> {
        self.instructions.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }
}

impl FromIterator<Instruction> for InstructionList {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self {
            instructions: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for InstructionList {
    type Item = Instruction;
    type IntoIter = std::collections::linked_list::IntoIter<Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.into_iter()
    }
}

impl<'a> IntoIterator for &'a InstructionList {
    type Item = &'a Instruction;
    type IntoIter = std::collections::linked_list::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}
