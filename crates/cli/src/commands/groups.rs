use std::path::Path;

use anyhow::{Context, Result};
use inventory_core::db::{AppGroup, GroupColor, GroupId};
use serde::Serialize;

use crate::commands::{key_from_arg, open_context};

#[derive(Serialize)]
pub struct GroupListing<'a> {
    #[serde(flatten)]
    pub group: &'a AppGroup,
    pub members: Vec<&'a str>,
}

/// List all groups with their members.
pub fn list_groups_command(data_dir: Option<&Path>, json: bool) -> Result<()> {
    let ctx = open_context(data_dir)?;
    let listings: Vec<GroupListing<'_>> = ctx
        .groups
        .groups()
        .map(|group| GroupListing { group, members: ctx.groups.members(group.id) })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    if listings.is_empty() {
        println!("No groups defined.");
        return Ok(());
    }

    println!("Groups:");
    for listing in listings {
        let color = listing.group.color.as_ref().map(GroupColor::as_str).unwrap_or("none");
        println!(
            "- [{}] {} (color: {}, members: {})",
            listing.group.id,
            listing.group.display_name,
            color,
            listing.members.len()
        );
        for member in listing.members {
            println!("    {member}");
        }
    }

    Ok(())
}

pub fn create_group_command(data_dir: Option<&Path>, name: &str) -> Result<()> {
    let mut ctx = open_context(data_dir)?;
    let group = ctx.groups.create_group(name)?;
    let color = group.color.as_ref().map(GroupColor::as_str).unwrap_or("none");
    println!("Created group [{}] {} (color: {})", group.id, group.display_name, color);
    Ok(())
}

pub fn rename_group_command(data_dir: Option<&Path>, id: i64, name: &str) -> Result<()> {
    let mut ctx = open_context(data_dir)?;
    let id = GroupId::new(id);
    ctx.groups.rename_group(id, name)?;
    println!("Renamed group [{id}] to {}", name.trim());
    Ok(())
}

/// Set a group's colour, or clear it when `color` is `None`.
pub fn color_group_command(data_dir: Option<&Path>, id: i64, color: Option<&str>) -> Result<()> {
    let mut ctx = open_context(data_dir)?;
    let id = GroupId::new(id);
    let color = color.map(str::parse::<GroupColor>).transpose()?;
    ctx.groups.set_group_color(id, color.clone())?;
    match color {
        Some(color) => println!("Group [{id}] color set to {color}"),
        None => println!("Group [{id}] color cleared"),
    }
    Ok(())
}

pub fn delete_group_command(data_dir: Option<&Path>, id: i64) -> Result<()> {
    let mut ctx = open_context(data_dir)?;
    let id = GroupId::new(id);
    let cleared = ctx.groups.delete_group(id)?;
    println!("Deleted group [{id}] ({cleared} assignments cleared)");
    Ok(())
}

/// Assign an application (by display name or key) to a group.
pub fn assign_command(data_dir: Option<&Path>, name: &str, group: i64, is_key: bool) -> Result<()> {
    let mut ctx = open_context(data_dir)?;
    let key = key_from_arg(name, is_key)?;
    let id = GroupId::new(group);
    ctx.groups
        .assign(&key, id)
        .with_context(|| format!("Failed to assign {key:?} to group {id}"))?;
    let group_name = ctx.groups.group(id).map(|g| g.display_name.as_str()).unwrap_or_default();
    println!("Assigned {key} to [{id}] {group_name}");
    Ok(())
}

pub fn unassign_command(data_dir: Option<&Path>, name: &str, is_key: bool) -> Result<()> {
    let mut ctx = open_context(data_dir)?;
    let key = key_from_arg(name, is_key)?;
    if ctx.groups.unassign(&key)? {
        println!("Removed group assignment for {key}");
    } else {
        println!("No group assignment for {key}");
    }
    Ok(())
}
