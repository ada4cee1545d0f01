// SPDX-License-Identifier: GPL-3.0-only

//! Canned tool output

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartedEntry {
    pub number: u32,
    pub start: u64,
    pub end: u64,
    pub fs: String,
    pub name: String,
}

/// A disk as `parted -ms <disk> unit B print` reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartedDisk {
    pub path: String,
    pub size: u64,
    pub entries: Vec<PartedEntry>,
}

impl PartedDisk {
    pub fn new(path: &str, size: u64) -> Self {
        Self {
            path: path.to_string(),
            size,
            entries: Vec::new(),
        }
    }

    pub fn partition(mut self, number: u32, start: u64, end: u64, fs: &str, name: &str) -> Self {
        self.entries.push(PartedEntry {
            number,
            start,
            end,
            fs: fs.to_string(),
            name: name.to_string(),
        });
        self
    }

    /// Machine-readable listing, including the `BYT;` header
    pub fn render(&self) -> String {
        let mut out = String::from("BYT;\n");
        out.push_str(&format!(
            "{}:{}B:scsi:512:512:gpt:Generic Flash Disk:;\n",
            self.path, self.size
        ));
        for entry in &self.entries {
            out.push_str(&format!(
                "{}:{}B:{}B:{}B:{}:{}:;\n",
                entry.number,
                entry.start,
                entry.end,
                entry.end - entry.start + 1,
                entry.fs,
                entry.name
            ));
        }
        out
    }
}
