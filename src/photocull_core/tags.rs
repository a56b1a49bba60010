use crate::photocull_core::asset::Tag;
use crate::photocull_core::error::Result;
use crate::photocull_core::session::Session;
use std::path::Path;

/// Tagging commands the browsing surface can issue for an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCommand {
    MarkSelected,
    MarkToRemove,
    Unmark,
    /// SELECTED goes back to UNMARKED, anything else becomes SELECTED.
    ToggleSelected,
    /// TO_REMOVE goes back to UNMARKED, anything else becomes TO_REMOVE.
    ToggleToRemove,
}

impl TagCommand {
    /// Tag an asset ends up with when this command is applied to `current`.
    pub fn target(&self, current: Tag) -> Tag {
        match self {
            TagCommand::MarkSelected => Tag::Selected,
            TagCommand::MarkToRemove => Tag::ToRemove,
            TagCommand::Unmark => Tag::Unmarked,
            TagCommand::ToggleSelected if current == Tag::Selected => Tag::Unmarked,
            TagCommand::ToggleSelected => Tag::Selected,
            TagCommand::ToggleToRemove if current == Tag::ToRemove => Tag::Unmarked,
            TagCommand::ToggleToRemove => Tag::ToRemove,
        }
    }
}

impl Session {
    /// Apply a tag command and return the asset's new tag.
    ///
    /// Only the tag changes; the selected frame is left alone.
    pub fn apply(&mut self, id: &Path, command: TagCommand) -> Result<Tag> {
        let asset = self.get_mut(id)?;
        let tag = command.target(asset.tag());
        if tag != asset.tag() {
            log::debug!("{}: {} -> {}", id.display(), asset.tag(), tag);
            asset.set_tag(tag);
        }
        Ok(tag)
    }

    pub fn mark_selected(&mut self, id: &Path) -> Result<()> {
        self.apply(id, TagCommand::MarkSelected).map(|_| ())
    }

    pub fn mark_to_remove(&mut self, id: &Path) -> Result<()> {
        self.apply(id, TagCommand::MarkToRemove).map(|_| ())
    }

    pub fn unmark(&mut self, id: &Path) -> Result<()> {
        self.apply(id, TagCommand::Unmark).map(|_| ())
    }

    pub fn toggle_selected(&mut self, id: &Path) -> Result<Tag> {
        self.apply(id, TagCommand::ToggleSelected)
    }

    pub fn toggle_to_remove(&mut self, id: &Path) -> Result<Tag> {
        self.apply(id, TagCommand::ToggleToRemove)
    }
}
