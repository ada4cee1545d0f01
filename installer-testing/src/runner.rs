// SPDX-License-Identifier: GPL-3.0-only

use std::collections::{BTreeSet, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use installer_contracts::{CommandOutput, CommandRunner, Result, render};
use tracing::debug;

use crate::{FakeTree, lock};

/// Scripted answer to a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Reply {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn fail(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

#[derive(Debug)]
struct Rule {
    prefix: String,
    replies: VecDeque<Reply>,
}

#[derive(Debug)]
struct Effect {
    prefix: String,
    creates: PathBuf,
}

#[derive(Debug, Default)]
struct Script {
    calls: Vec<String>,
    rules: Vec<Rule>,
    effects: Vec<Effect>,
    missing: BTreeSet<String>,
}

impl Script {
    /// Longest matching prefix wins; its queue is drained down to the last reply.
    fn answer(&mut self, command: &str) -> Reply {
        let rule = self
            .rules
            .iter_mut()
            .filter(|rule| command.starts_with(&rule.prefix))
            .max_by_key(|rule| rule.prefix.len());

        match rule {
            Some(rule) if rule.replies.len() > 1 => {
                rule.replies.pop_front().unwrap_or_else(|| Reply::ok(""))
            }
            Some(rule) => rule.replies.front().cloned().unwrap_or_else(|| Reply::ok("")),
            None => Reply::ok(""),
        }
    }
}

/// Command runner that records every invocation and answers from a script
///
/// Unscripted commands succeed with empty output.
#[derive(Debug, Default)]
pub struct FakeRunner {
    script: Mutex<Script>,
    tree: Option<FakeTree>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let successful commands create nodes in `tree` (see [`FakeRunner::creates`])
    pub fn with_tree(tree: FakeTree) -> Self {
        Self {
            script: Mutex::default(),
            tree: Some(tree),
        }
    }

    /// Queue a reply for commands whose rendered line starts with `prefix`.
    ///
    /// Replies are used in order; the last one repeats.
    pub fn reply(&self, prefix: &str, reply: Reply) -> &Self {
        let mut script = lock(&self.script);
        match script.rules.iter_mut().find(|rule| rule.prefix == prefix) {
            Some(rule) => rule.replies.push_back(reply),
            None => script.rules.push(Rule {
                prefix: prefix.to_string(),
                replies: VecDeque::from([reply]),
            }),
        }
        self
    }

    /// Create `path` in the attached tree when a command starting with `prefix` succeeds
    pub fn creates(&self, prefix: &str, path: impl Into<PathBuf>) -> &Self {
        lock(&self.script).effects.push(Effect {
            prefix: prefix.to_string(),
            creates: path.into(),
        });
        self
    }

    /// Report `program` as absent from `PATH`
    pub fn without_program(&self, program: &str) -> &Self {
        lock(&self.script).missing.insert(program.to_string());
        self
    }

    /// Every command run so far, rendered
    pub fn calls(&self) -> Vec<String> {
        lock(&self.script).calls.clone()
    }

    /// Index of the first call starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        lock(&self.script)
            .calls
            .iter()
            .position(|call| call.starts_with(prefix))
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.position(prefix).is_some()
    }

    /// Calls whose program is one of `programs`
    pub fn calls_to(&self, programs: &[&str]) -> Vec<String> {
        lock(&self.script)
            .calls
            .iter()
            .filter(|call| {
                let program = call.split_whitespace().next().unwrap_or_default();
                programs.contains(&program)
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let command = render(program, args);
        debug!("fake run: {command}");

        let (reply, created) = {
            let mut script = lock(&self.script);
            script.calls.push(command.clone());
            let reply = script.answer(&command);
            let created: Vec<PathBuf> = if reply.code == 0 {
                script
                    .effects
                    .iter()
                    .filter(|effect| command.starts_with(&effect.prefix))
                    .map(|effect| effect.creates.clone())
                    .collect()
            } else {
                Vec::new()
            };
            (reply, created)
        };

        if let Some(tree) = &self.tree {
            for path in created {
                tree.add_file(path, "");
            }
        }

        Ok(CommandOutput {
            command,
            code: reply.code,
            stdout: reply.stdout,
            stderr: reply.stderr,
        })
    }

    fn has_program(&self, program: &str) -> bool {
        !lock(&self.script).missing.contains(program)
    }
}
