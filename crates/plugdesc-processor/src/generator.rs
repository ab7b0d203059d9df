//! One processing round: extract, validate, then write

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

use plugdesc_ast::{Declaration, ProcessingBackend};
use plugdesc_config::ProcessorConfig;
use plugdesc_descriptor::{validate, write_descriptor, PluginDescriptor, ValidationRules};

use crate::errors::GenerateError;
use crate::extract::extract_descriptor;

/// A descriptor that made it to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenDescriptor {
    pub descriptor: PluginDescriptor,
    pub path: PathBuf,
}

/// Result of one round
#[derive(Debug, Default)]
pub struct RoundOutcome {
    pub written: Vec<WrittenDescriptor>,
    /// Declarations to hand back in the next round
    pub deferred: Vec<Declaration>,
    /// An invalid descriptor kept every file of this round from being written
    pub blocked: bool,
}

/// Turns marked declarations into descriptor files, one round at a time
///
/// The generator keeps no state between rounds; the caller threads the
/// deferred declarations through.
#[derive(Debug, Clone)]
pub struct DescriptorGenerator {
    descriptor_file: String,
    rules: ValidationRules,
}

impl DescriptorGenerator {
    pub fn new(config: &ProcessorConfig) -> Self {
        DescriptorGenerator {
            descriptor_file: config.descriptor_file.clone(),
            rules: ValidationRules::new(config.reserved_ids.iter().cloned()),
        }
    }

    /// Run one round over this round's marked declarations plus the ones
    /// deferred by earlier rounds
    pub fn process_round(
        &self,
        backend: &mut dyn ProcessingBackend,
        carried: Vec<Declaration>,
    ) -> RoundOutcome {
        let start = Instant::now();

        let mut candidates = carried;
        candidates.extend(backend.find_annotated_declarations());
        candidates.sort();
        candidates.dedup();

        let (ready, deferred): (Vec<Declaration>, Vec<Declaration>) = candidates
            .into_iter()
            .partition(|decl| backend.is_resolvable(decl));
        debug!(
            "Round has {} ready and {} deferred declaration(s)",
            ready.len(),
            deferred.len()
        );

        let mut prepared = Vec::with_capacity(ready.len());
        for decl in ready {
            match self.prepare(&*backend, &decl) {
                Ok(descriptor) => prepared.push((decl, descriptor)),
                Err(err) => report(backend, &decl, &err),
            }
        }

        let invalid = self.validate_all(backend, &prepared);
        if invalid > 0 {
            backend.log_notice(
                &format!(
                    "no descriptors written this round: {} invalid plugin declaration(s)",
                    invalid
                ),
                None,
            );
            return RoundOutcome {
                written: Vec::new(),
                deferred,
                blocked: true,
            };
        }

        let written = self.write_all(backend, prepared);
        info!(
            "Round wrote {} descriptor(s) in {:.3}ms",
            written.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        RoundOutcome {
            written,
            deferred,
            blocked: false,
        }
    }

    fn prepare(
        &self,
        backend: &dyn ProcessingBackend,
        decl: &Declaration,
    ) -> Result<PluginDescriptor, GenerateError> {
        let main = backend.qualified_name(decl)?;
        let view = backend.find_marker_annotation(decl)?;
        Ok(extract_descriptor(&view, main)?)
    }

    /// Report every invalid descriptor and return how many there were
    fn validate_all(
        &self,
        backend: &mut dyn ProcessingBackend,
        prepared: &[(Declaration, PluginDescriptor)],
    ) -> usize {
        let mut invalid = 0;
        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        for (decl, descriptor) in prepared {
            let checked = validate(descriptor, &self.rules)
                .map_err(GenerateError::from)
                .and_then(|()| match seen.get(descriptor.id.as_str()) {
                    Some(first) => Err(GenerateError::DuplicateId {
                        id: descriptor.id.clone(),
                        first: (*first).to_string(),
                    }),
                    None => Ok(()),
                });
            match checked {
                Ok(()) => {
                    seen.insert(&descriptor.id, &descriptor.main);
                }
                Err(err) => {
                    report(backend, decl, &err);
                    invalid += 1;
                }
            }
        }
        invalid
    }

    fn write_all(
        &self,
        backend: &mut dyn ProcessingBackend,
        prepared: Vec<(Declaration, PluginDescriptor)>,
    ) -> Vec<WrittenDescriptor> {
        let mut targets = BTreeSet::new();
        let mut written = Vec::with_capacity(prepared.len());
        for (decl, descriptor) in prepared {
            let target = backend.output_path(decl.package(), &self.descriptor_file);
            if !targets.insert(target.clone()) {
                backend.log_warning(
                    &format!(
                        "multiple plugins in one package are not supported; skipping '{}', {:?} is already taken",
                        descriptor.id, target
                    ),
                    Some(&decl),
                );
                continue;
            }

            match self.write_one(backend, &decl, &descriptor) {
                Ok(path) => {
                    debug!("Wrote descriptor '{}' to {:?}", descriptor.id, path);
                    written.push(WrittenDescriptor { descriptor, path });
                }
                Err(err) => backend.log_error(
                    &format!("could not write descriptor for plugin '{}'", descriptor.id),
                    Some(&decl),
                    Some(&err),
                ),
            }
        }
        written
    }

    fn write_one(
        &self,
        backend: &mut dyn ProcessingBackend,
        decl: &Declaration,
        descriptor: &PluginDescriptor,
    ) -> Result<PathBuf, GenerateError> {
        let mut sink = backend.open_output(decl.package(), &self.descriptor_file, decl)?;
        write_descriptor(descriptor, &mut sink)?;
        let path = sink.path().to_path_buf();
        sink.finish().map_err(|source| GenerateError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

fn report(backend: &mut dyn ProcessingBackend, decl: &Declaration, err: &GenerateError) {
    backend.log_error(&err.to_string(), Some(decl), err.source());
}
