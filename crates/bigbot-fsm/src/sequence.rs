//! 命令序列

use crate::command::Command;

/// 有名字的、不可变的命令列表
///
/// 序列保存的是命令原型：管理器到达某一步时克隆出新的命令实例来执行，
/// 因此同一个序列可以被执行多次（例如 `reset()` 之后）。
#[derive(Debug, Clone)]
pub struct Sequence {
    name: String,
    commands: Vec<Command>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, commands: Vec<Command>) -> Self {
        Self {
            name: name.into(),
            commands,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn get(&self, index: usize) -> Option<&Command> {
        self.commands.get(index)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// 左右镜像后的序列（名字不变）
    pub fn mirrored(&self) -> Self {
        Self {
            name: self.name.clone(),
            commands: self.commands.iter().map(Command::mirrored).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateId;

    #[test]
    fn test_mirrored_sequence_swaps_rotations() {
        let sequence = Sequence::new(
            "turns",
            vec![
                Command::rotate_left(90.0, 0.5),
                Command::move_forward(10.0, 0.5),
                Command::rotate_right(45.0, 0.5),
            ],
        );
        let mirrored = sequence.mirrored();
        let ids: Vec<_> = mirrored
            .commands()
            .iter()
            .filter_map(|c| c.state().map(|(id, _)| id))
            .collect();
        assert_eq!(
            ids,
            vec![StateId::RotateRight, StateId::MoveForward, StateId::RotateLeft]
        );
        assert_eq!(mirrored.name(), "turns");
        assert_eq!(mirrored.len(), 3);
    }
}
