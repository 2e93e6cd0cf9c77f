/* This file is part of fundfi (https://codeberg.org/fundfi/fundfi)
 *
 * Copyright (C) 2024-2026 The fundfi developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::{
    fs::{create_dir_all, File},
    io::{BufReader, Read, Write},
    path::Path,
};

use crate::Result;

pub fn load_file(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut st = String::new();
    reader.read_to_string(&mut st)?;
    Ok(st)
}

pub fn save_file(path: &Path, st: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(st.as_bytes())?;
    Ok(())
}

/// If no file exists at `path`, write the provided default contents to
/// it, creating parent directories as needed. Used to spawn a default
/// configuration file on first run.
pub fn spawn_config(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        return Ok(())
    }

    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    save_file(path, contents)?;
    eprintln!("Initialized configuration file: {}", path.display());

    Ok(())
}
