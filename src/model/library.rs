// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Arena of definitions and instances
//!
//! The library owns every [`ExecDef`] and every [`Exec`]. Declaring a block
//! deep-copies its template: each template instance is declared again under
//! the new block, keeps its name, path and overrides, and has its
//! dependencies remapped onto the new copies. Two instances of the same
//! block therefore never share a dependency graph.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::definition::{Argument, BlockDef, DefId, DefKind, ExecDef, JobType};
use super::instance::{Exec, ExecId, ExecKind};
use crate::errors::{SeqError, SeqResult};
use crate::utils::text::quote;

/// Definitions and instances of one sequence
#[derive(Debug, Clone, Default)]
pub struct Library {
    defs: Vec<ExecDef>,
    execs: Vec<Exec>,
    by_name: HashMap<String, DefId>,
}

/// The job type inserted to convert a file between formats
pub fn conversion_job_type(name: &str) -> JobType {
    let mut job = JobType::new(name)
        .with_argument(Argument::new("infile"))
        .with_argument(Argument::new("outfile"))
        .with_command(&format!("{} $(infile) $(outfile)", name));
    job.description = "Convert a file between formats".to_string();
    job
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// A library that already knows the conversion job type
    pub fn with_builtins(conversion: &str) -> Self {
        let mut library = Self::new();
        library.add_job_type(conversion_job_type(conversion));
        library
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Definitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a definition; a definition of the same name is replaced in
    /// place and keeps its id and instances
    pub fn register(&mut self, kind: DefKind) -> DefId {
        let name = match &kind {
            DefKind::Job(job) => job.name.clone(),
            DefKind::Block(block) => block.name.clone(),
        };
        if let Some(&id) = self.by_name.get(&name) {
            self.defs[id.0].kind = kind;
            return id;
        }
        let id = DefId(self.defs.len());
        self.defs.push(ExecDef::new(kind));
        self.by_name.insert(name, id);
        id
    }

    pub fn add_job_type(&mut self, job: JobType) -> DefId {
        self.register(DefKind::Job(job))
    }

    pub fn add_block_def(&mut self, block: BlockDef) -> DefId {
        self.register(DefKind::Block(block))
    }

    pub fn lookup(&self, name: &str) -> Option<DefId> {
        self.by_name.get(name).copied()
    }

    /// Look up a definition by name, failing when it does not exist
    pub fn require(&self, name: &str) -> SeqResult<DefId> {
        self.lookup(name).ok_or_else(|| SeqError::UnknownDefinition {
            name: name.to_string(),
        })
    }

    pub fn def(&self, id: DefId) -> &ExecDef {
        &self.defs[id.0]
    }

    pub fn def_mut(&mut self, id: DefId) -> &mut ExecDef {
        &mut self.defs[id.0]
    }

    pub fn defs(&self) -> impl Iterator<Item = (DefId, &ExecDef)> {
        self.defs.iter().enumerate().map(|(i, def)| (DefId(i), def))
    }

    pub fn job_type(&self, id: DefId) -> SeqResult<&JobType> {
        let def = self.def(id);
        def.as_job_type().ok_or_else(|| SeqError::NotAJobType {
            name: def.name().to_string(),
        })
    }

    pub fn block_def_mut(&mut self, id: DefId) -> SeqResult<&mut BlockDef> {
        let def = &mut self.defs[id.0];
        let name = def.name().to_string();
        match &mut def.kind {
            DefKind::Block(block) => Ok(block),
            DefKind::Job(_) => Err(SeqError::NotABlock { name }),
        }
    }

    /// Append an instance to a block definition's template
    pub fn push_template(&mut self, block: DefId, exec: ExecId) -> SeqResult<()> {
        self.block_def_mut(block)?.template.push(exec);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Instances
    // ─────────────────────────────────────────────────────────────────────────

    pub fn exec(&self, id: ExecId) -> &Exec {
        &self.execs[id.0]
    }

    pub fn exec_mut(&mut self, id: ExecId) -> &mut Exec {
        &mut self.execs[id.0]
    }

    pub fn def_name(&self, id: ExecId) -> &str {
        self.def(self.exec(id).def).name()
    }

    /// The job type an instance was declared from
    pub fn job_type_of(&self, id: ExecId) -> SeqResult<&JobType> {
        self.job_type(self.exec(id).def)
    }

    /// Declare a top-level instance
    pub fn declare(&mut self, def: DefId) -> SeqResult<ExecId> {
        self.declare_with_parent(def, None)
    }

    /// Create an instance of `def` under `parent`
    ///
    /// The name is `parent_def` plus a per-parent counter (`""`, `001`,
    /// ...). Path, overrides and dependencies start empty. A block that is
    /// already being expanded further up the chain is rejected.
    pub fn declare_with_parent(&mut self, def: DefId, parent: Option<ExecId>) -> SeqResult<ExecId> {
        self.declare_in(def, parent, &mut Vec::new())
    }

    fn declare_in(
        &mut self,
        def: DefId,
        parent: Option<ExecId>,
        expanding: &mut Vec<DefId>,
    ) -> SeqResult<ExecId> {
        let is_block = self.def(def).is_block();
        if is_block && expanding.contains(&def) {
            let mut chain: Vec<&str> = expanding.iter().map(|d| self.def(*d).name()).collect();
            chain.push(self.def(def).name());
            return Err(SeqError::CyclicBlock {
                name: self.def(def).name().to_string(),
                chain: chain.join(" → "),
            });
        }

        let prefix = parent
            .map(|p| self.exec(p).name.clone())
            .filter(|name| !name.is_empty());
        let def_name = self.def(def).name().to_string();
        let suffix = self.def_mut(def).next_suffix(parent);
        let name = match prefix {
            Some(prefix) => format!("{}_{}{}", prefix, def_name, suffix),
            None => format!("{}{}", def_name, suffix),
        };

        let id = ExecId(self.execs.len());
        self.execs.push(Exec {
            id,
            name,
            path: String::new(),
            data: BTreeMap::new(),
            depends: Vec::new(),
            parent,
            def,
            kind: if is_block {
                ExecKind::Block { execs: Vec::new() }
            } else {
                ExecKind::Job
            },
        });

        let entry = self.def_mut(def);
        entry.instances.push(id);
        entry.usage += 1;

        self.update_in(id, expanding)?;
        Ok(id)
    }

    /// Rebuild a block instance's children from its definition's template
    pub fn update_instance(&mut self, exec: ExecId) -> SeqResult<()> {
        self.update_in(exec, &mut Vec::new())
    }

    /// Re-apply the definition to every instance declared from it
    pub fn update_instances(&mut self, def: DefId) -> SeqResult<()> {
        for exec in self.def(def).instances.clone() {
            self.update_instance(exec)?;
        }
        Ok(())
    }

    fn update_in(&mut self, exec: ExecId, expanding: &mut Vec<DefId>) -> SeqResult<()> {
        let def = self.exec(exec).def;
        let template = match &self.def(def).kind {
            DefKind::Block(block) => block.template.clone(),
            DefKind::Job(_) => return Ok(()),
        };

        expanding.push(def);
        let copies = self.transfer_execs(&template, exec, expanding);
        expanding.pop();

        let copies = copies?;
        if let ExecKind::Block { execs } = &mut self.exec_mut(exec).kind {
            *execs = copies;
        }
        Ok(())
    }

    fn transfer_execs(
        &mut self,
        template: &[ExecId],
        parent: ExecId,
        expanding: &mut Vec<DefId>,
    ) -> SeqResult<Vec<ExecId>> {
        let mut mapping = HashMap::with_capacity(template.len());
        let mut copies = Vec::with_capacity(template.len());

        for &original in template {
            let copy = self.declare_in(self.exec(original).def, Some(parent), expanding)?;
            let source = self.exec(original);
            let (name, path, data) = (source.name.clone(), source.path.clone(), source.data.clone());

            let target = self.exec_mut(copy);
            target.name = name;
            target.path = path;
            target.data = data;

            mapping.insert(original, copy);
            copies.push(copy);
        }

        for (&original, &copy) in template.iter().zip(&copies) {
            let mut depends = Vec::new();
            for dep in &self.exec(original).depends {
                match mapping.get(dep) {
                    Some(mapped) => depends.push(*mapped),
                    None => tracing::warn!(
                        "dependency of '{}' lies outside its block template and was dropped",
                        self.exec(original).name
                    ),
                }
            }
            self.exec_mut(copy).depends = depends;
        }

        Ok(copies)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Structure queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether `x` is anywhere below `container`
    pub fn contains(&self, container: ExecId, x: ExecId) -> bool {
        self.exec(container)
            .execs()
            .iter()
            .any(|child| *child == x || self.contains(*child, x))
    }

    /// Whether `x` is a direct dependency of `e` or inside one
    pub fn depends_on(&self, e: ExecId, x: ExecId) -> bool {
        self.exec(e)
            .depends
            .iter()
            .any(|dep| *dep == x || self.contains(*dep, x))
    }

    /// Declared dependencies, or those of the nearest ancestor that has any
    pub fn effective_depends(&self, e: ExecId) -> &[ExecId] {
        let mut current = Some(e);
        while let Some(id) = current {
            let exec = self.exec(id);
            if !exec.depends.is_empty() {
                return &exec.depends;
            }
            current = exec.parent;
        }
        &[]
    }

    /// Whether `x` is reachable from `e` through dependencies and
    /// containment
    pub fn depends_on_transitively(&self, e: ExecId, x: ExecId) -> bool {
        let mut visited = HashSet::new();
        let mut stack: Vec<ExecId> = self.effective_depends(e).to_vec();
        while let Some(dep) = stack.pop() {
            if !visited.insert(dep) {
                continue;
            }
            if dep == x || self.contains(dep, x) {
                return true;
            }
            stack.extend_from_slice(self.effective_depends(dep));
        }
        false
    }

    /// Enclosing blocks, nearest first
    pub fn ancestors(&self, e: ExecId) -> Vec<ExecId> {
        let mut out = Vec::new();
        let mut current = self.exec(e).parent;
        while let Some(id) = current {
            out.push(id);
            current = self.exec(id).parent;
        }
        out
    }

    /// Dataset path segments from the outermost block down to `e`
    pub fn full_path_segments(&self, e: ExecId) -> Vec<String> {
        let mut levels = vec![self.exec(e).path.as_str()];
        levels.extend(self.ancestors(e).into_iter().map(|a| self.exec(a).path.as_str()));
        levels
            .iter()
            .rev()
            .flat_map(|path| path.split(':'))
            .filter(|segment| !segment.is_empty())
            .map(String::from)
            .collect()
    }

    /// Dataset path of `e` relative to the root node
    pub fn full_path(&self, e: ExecId) -> String {
        self.full_path_segments(e).join(":")
    }

    /// Every job at or below `e`
    pub fn jobs_within(&self, e: ExecId) -> Vec<ExecId> {
        let exec = self.exec(e);
        match &exec.kind {
            ExecKind::Job => vec![e],
            ExecKind::Block { execs } => execs.iter().flat_map(|c| self.jobs_within(*c)).collect(),
        }
    }

    /// Every instance named `name` at or below `root`, depth first
    pub fn find_instances(&self, root: ExecId, name: &str) -> Vec<ExecId> {
        let mut found = Vec::new();
        if self.exec(root).name == name {
            found.push(root);
        }
        for child in self.exec(root).execs() {
            found.extend(self.find_instances(*child, name));
        }
        found
    }

    /// Resolve an instance name below `root`
    ///
    /// `a/b` looks for `b` inside the instance named `a`. Block copies keep
    /// their template names, so a bare name can match several instances;
    /// that is an error rather than a guess.
    pub fn resolve_instance(&self, root: ExecId, qualified: &str) -> SeqResult<ExecId> {
        let unknown = || SeqError::UnknownInstance {
            name: qualified.to_string(),
        };

        let mut current = root;
        for (depth, segment) in qualified.split('/').enumerate() {
            let scopes: Vec<ExecId> = if depth == 0 {
                vec![current]
            } else {
                self.exec(current).execs().to_vec()
            };
            let found: Vec<ExecId> = scopes
                .iter()
                .flat_map(|scope| self.find_instances(*scope, segment))
                .collect();

            current = match found.as_slice() {
                [] => return Err(unknown()),
                [single] => *single,
                several => {
                    let candidates: Vec<String> = several.iter().map(|e| self.instance_path(*e)).collect();
                    return Err(SeqError::AmbiguousInstance {
                        name: qualified.to_string(),
                        candidates: candidates.join(", "),
                    });
                }
            };
        }

        Ok(current)
    }

    /// Names from the outermost named block down to `e`, joined by `/`
    pub fn instance_path(&self, e: ExecId) -> String {
        let mut names: Vec<&str> = self
            .ancestors(e)
            .into_iter()
            .map(|a| self.exec(a).name.as_str())
            .filter(|name| !name.is_empty())
            .collect();
        names.reverse();
        names.push(self.exec(e).name.as_str());
        names.join("/")
    }

    /// Render an instance as a pipeline line
    pub fn instance_line(&self, e: ExecId) -> String {
        let exec = self.exec(e);
        let def = self.def(exec.def);
        let anonymous = def.as_block().is_some_and(|b| b.anonymous);

        let mut line = if anonymous {
            "block".to_string()
        } else {
            def.name().to_string()
        };
        if !exec.name.is_empty() {
            line.push_str(&format!(" name {}", exec.name));
        }
        if !exec.path.is_empty() {
            line.push_str(&format!(" using {}", exec.path));
        }
        if exec.depends.is_empty() {
            line.push_str(" nowait");
        }
        for dep in &exec.depends {
            line.push_str(&format!(" waitfor {}", self.exec(*dep).name));
        }
        for (key, value) in &exec.data {
            if value.is_empty() || value.contains(|c: char| c.is_whitespace() || c == '#' || c == '"') {
                line.push_str(&format!(" {}={}", key, quote(value)));
            } else {
                line.push_str(&format!(" {}={}", key, value));
            }
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> (Library, DefId, DefId) {
        let mut lib = Library::new();
        let a = lib.add_job_type(JobType::new("a"));
        let b = lib.add_job_type(JobType::new("b"));
        (lib, a, b)
    }

    /// Block `pair` holding `a` then `b`, with `b` waiting for `a`
    fn pair_block(lib: &mut Library, a: DefId, b: DefId) -> DefId {
        let block = lib.add_block_def(BlockDef::new("pair"));
        let ta = lib.declare(a).unwrap();
        let tb = lib.declare(b).unwrap();
        lib.exec_mut(tb).depends.push(ta);
        lib.exec_mut(ta).path = "*".to_string();
        lib.push_template(block, ta).unwrap();
        lib.push_template(block, tb).unwrap();
        block
    }

    #[test]
    fn test_declare_names_and_usage() {
        let (mut lib, a, _) = library();
        let first = lib.declare(a).unwrap();
        let second = lib.declare(a).unwrap();
        assert_eq!(lib.exec(first).name, "a");
        assert_eq!(lib.exec(second).name, "a001");
        assert_eq!(lib.def(a).usage, 2);
        assert_eq!(lib.def(a).instances(), &[first, second]);
    }

    #[test]
    fn test_declare_with_parent_prefixes_name() {
        let (mut lib, a, b) = library();
        let block = pair_block(&mut lib, a, b);
        let outer = lib.declare(block).unwrap();
        // The template copy already used the first name under `outer`
        let child = lib.declare_with_parent(a, Some(outer)).unwrap();
        assert_eq!(lib.exec(child).name, "pair_a001");
        assert_eq!(lib.exec(child).parent, Some(outer));
    }

    #[test]
    fn test_transfer_copies_template() {
        let (mut lib, a, b) = library();
        let block = pair_block(&mut lib, a, b);
        let inst = lib.declare(block).unwrap();

        let execs = lib.exec(inst).execs().to_vec();
        assert_eq!(execs.len(), 2);
        assert_eq!(lib.exec(execs[0]).name, "a");
        assert_eq!(lib.exec(execs[0]).path, "*");
        assert_eq!(lib.exec(execs[1]).depends, vec![execs[0]]);
        assert_eq!(lib.exec(execs[1]).parent, Some(inst));
    }

    #[test]
    fn test_instances_have_independent_graphs() {
        let (mut lib, a, b) = library();
        let block = pair_block(&mut lib, a, b);
        let first = lib.declare(block).unwrap();
        let second = lib.declare(block).unwrap();

        let one = lib.exec(first).execs().to_vec();
        let two = lib.exec(second).execs().to_vec();
        assert!(one.iter().all(|e| !two.contains(e)));
        assert_eq!(lib.exec(two[1]).depends, vec![two[0]]);
        assert!(!lib.depends_on(two[1], one[0]));
    }

    #[test]
    fn test_contains_and_depends_on_through_containment() {
        let (mut lib, a, b) = library();
        let block = pair_block(&mut lib, a, b);
        let first = lib.declare(block).unwrap();
        let second = lib.declare(block).unwrap();
        lib.exec_mut(second).depends.push(first);

        let inner = lib.exec(first).execs()[1];
        assert!(lib.contains(first, inner));
        assert!(!lib.contains(inner, first));
        assert!(lib.depends_on(second, inner));
        assert!(lib.depends_on(second, first));
        assert!(!lib.depends_on(first, second));
    }

    #[test]
    fn test_effective_and_transitive_depends() {
        let (mut lib, a, b) = library();
        let block = pair_block(&mut lib, a, b);
        let first = lib.declare(block).unwrap();
        let second = lib.declare(block).unwrap();
        lib.exec_mut(second).depends.push(first);

        let head = lib.exec(second).execs()[0];
        let upstream = lib.exec(first).execs()[0];
        assert!(lib.exec(head).depends.is_empty());
        assert_eq!(lib.effective_depends(head), &[first]);
        assert!(lib.depends_on_transitively(head, upstream));
        assert!(!lib.depends_on_transitively(upstream, head));
    }

    #[test]
    fn test_full_path_skips_empty_levels() {
        let (mut lib, a, b) = library();
        let block = pair_block(&mut lib, a, b);
        let inst = lib.declare(block).unwrap();
        lib.exec_mut(inst).path = "s*".to_string();

        let execs = lib.exec(inst).execs().to_vec();
        assert_eq!(lib.full_path(execs[0]), "s*:*");
        assert_eq!(lib.full_path(execs[1]), "s*");
        assert_eq!(lib.full_path_segments(execs[0]), vec!["s*", "*"]);
    }

    #[test]
    fn test_cyclic_block_rejected() {
        let (mut lib, a, _) = library();
        let outer = lib.add_block_def(BlockDef::new("outer"));
        let inner = lib.add_block_def(BlockDef::new("inner"));

        let job = lib.declare(a).unwrap();
        lib.push_template(inner, job).unwrap();
        let inner_inst = lib.declare(inner).unwrap();
        lib.push_template(outer, inner_inst).unwrap();
        let outer_inst = lib.declare(outer).unwrap();
        lib.push_template(inner, outer_inst).unwrap();

        let err = lib.declare(outer).unwrap_err();
        match err {
            SeqError::CyclicBlock { name, chain } => {
                assert_eq!(name, "outer");
                assert_eq!(chain, "outer → inner → outer");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_update_instances_propagates_template_changes() {
        let (mut lib, a, b) = library();
        let block = pair_block(&mut lib, a, b);
        let inst = lib.declare(block).unwrap();
        assert_eq!(lib.exec(inst).execs().len(), 2);

        let extra = lib.declare(a).unwrap();
        lib.push_template(block, extra).unwrap();
        lib.update_instances(block).unwrap();
        assert_eq!(lib.exec(inst).execs().len(), 3);
    }

    #[test]
    fn test_jobs_within_and_find_instances() {
        let (mut lib, a, b) = library();
        let block = pair_block(&mut lib, a, b);
        let inst = lib.declare(block).unwrap();
        let execs = lib.exec(inst).execs().to_vec();

        assert_eq!(lib.jobs_within(inst), execs);
        assert_eq!(lib.find_instances(inst, "b"), vec![execs[1]]);
        assert!(lib.find_instances(inst, "zzz").is_empty());
    }

    #[test]
    fn test_resolve_instance_in_block_copies() {
        let (mut lib, a, b) = library();
        let block = pair_block(&mut lib, a, b);
        let first = lib.declare(block).unwrap();
        let second = lib.declare(block).unwrap();
        let top = lib.add_block_def(BlockDef::new("top"));
        lib.push_template(top, first).unwrap();
        lib.push_template(top, second).unwrap();
        let root = lib.declare(top).unwrap();

        let copies = lib.exec(root).execs().to_vec();
        let second_name = lib.exec(copies[1]).name.clone();
        let target = lib.exec(copies[1]).execs()[1];

        assert!(matches!(
            lib.resolve_instance(root, "b"),
            Err(SeqError::AmbiguousInstance { .. })
        ));
        assert_eq!(lib.resolve_instance(root, &format!("{}/b", second_name)).unwrap(), target);
        assert_eq!(lib.instance_path(target), format!("top/{}/b", second_name));
        assert!(matches!(
            lib.resolve_instance(root, &format!("{}/zzz", second_name)),
            Err(SeqError::UnknownInstance { .. })
        ));
    }

    #[test]
    fn test_instance_line() {
        let (mut lib, a, b) = library();
        let block = pair_block(&mut lib, a, b);
        let inst = lib.declare(block).unwrap();
        let execs = lib.exec(inst).execs().to_vec();
        lib.exec_mut(execs[1])
            .data
            .insert("label".to_string(), "two words".to_string());

        assert_eq!(lib.instance_line(execs[0]), "a name a using * nowait");
        assert_eq!(
            lib.instance_line(execs[1]),
            "b name b waitfor a label=\"two words\""
        );
    }

    #[test]
    fn test_register_replaces_by_name() {
        let (mut lib, a, _) = library();
        let again = lib.add_job_type(JobType::new("a").with_command("run"));
        assert_eq!(a, again);
        assert_eq!(lib.job_type(a).unwrap().commands.len(), 1);
        assert!(matches!(lib.require("nope"), Err(SeqError::UnknownDefinition { .. })));
    }
}
