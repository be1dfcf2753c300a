//=====================================================
// File: profiler.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Operator controls for the instrumentation engine
// Objective: Enable, disable, reset and report, owning the registry, the
//            disabled flag and the pass counters
//=====================================================

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::body::{DisabledFlag, MethodBody};
use crate::config::ProfilerConfig;
use crate::eligibility::EligibilityFilter;
use crate::host::MethodPatcher;
use crate::metrics::{Report, ReportOptions, build_report};
use crate::reflect::{Domain, MethodHandle};
use crate::registry::{InstrumentationRegistry, Slot};
use crate::rewriter::{ProbeSite, rewrite};
use crate::{ProfilerError, ProfilerResult};

/// Result of a single [`Profiler::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Instrumented(Slot),
    /// Registered, but the body never returns so nothing was injected.
    PassThrough(Slot),
    /// Left alone because another optimisation pass already owns the body.
    AlreadyOptimized,
}

/// Tally of one [`Profiler::enable`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnableSummary {
    pub candidates: usize,
    pub instrumented: usize,
    pub pass_through: usize,
    pub skipped: usize,
    pub failed: usize,
    /// True when an earlier pass had already patched methods and this call
    /// only cleared the disabled flag.
    pub resumed: bool,
}

#[derive(Debug)]
pub struct Profiler {
    registry: InstrumentationRegistry,
    disabled: DisabledFlag,
    filter: EligibilityFilter,
    report_options: ReportOptions,
    scanned: AtomicBool,
    patched: AtomicUsize,
    failed: AtomicUsize,
}

impl Profiler {
    pub fn new(filter: EligibilityFilter, capacity: usize, report_options: ReportOptions) -> Self {
        Self {
            registry: InstrumentationRegistry::with_capacity(capacity),
            disabled: DisabledFlag::new(),
            filter,
            report_options,
            scanned: AtomicBool::new(false),
            patched: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &ProfilerConfig, domain: &Domain) -> ProfilerResult<Self> {
        let filter = EligibilityFilter::from_config(config, domain)?;
        Ok(Self::new(filter, config.max_slots, config.report))
    }

    pub fn registry(&self) -> &InstrumentationRegistry {
        &self.registry
    }

    pub fn filter(&self) -> &EligibilityFilter {
        &self.filter
    }

    pub fn disabled_flag(&self) -> &DisabledFlag {
        &self.disabled
    }

    pub fn is_active(&self) -> bool {
        self.scanned.load(Ordering::Acquire) && !self.disabled.is_set()
    }

    /// Methods an enable pass has attempted, failures included.
    pub fn patched_count(&self) -> usize {
        self.patched.load(Ordering::Relaxed)
    }

    pub fn failed_count(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Eligible methods of the target module, nested types included, each
    /// listed once.
    pub fn candidates(&self, domain: &Domain) -> Vec<MethodHandle> {
        let types = domain.including_nested(&domain.module_types(self.filter.target()));
        let mut seen = HashSet::new();
        types
            .into_iter()
            .flat_map(|ty| domain.fully_constructed_methods(ty))
            .filter(|method| self.filter.allows_instrumentation(&domain.method(*method)))
            .filter(|method| seen.insert(*method))
            .collect()
    }

    /// Instruments every candidate. A second call after a successful pass
    /// only clears the disabled flag.
    pub fn enable(&self, domain: &Domain, patcher: &dyn MethodPatcher) -> EnableSummary {
        self.disabled.set(false);
        if self.scanned.swap(true, Ordering::AcqRel) {
            info!("profiler resumed");
            return EnableSummary {
                resumed: true,
                ..EnableSummary::default()
            };
        }

        let candidates = self.candidates(domain);
        let previously_patched = patcher.previously_patched();
        let mut summary = EnableSummary {
            candidates: candidates.len(),
            ..EnableSummary::default()
        };
        info!("Patching {} methods", candidates.len());

        for method in candidates {
            match self.apply(domain, patcher, method, &previously_patched) {
                Ok(ApplyOutcome::Instrumented(_)) => summary.instrumented += 1,
                Ok(ApplyOutcome::PassThrough(_)) => summary.pass_through += 1,
                Ok(ApplyOutcome::AlreadyOptimized) => summary.skipped += 1,
                Err(err) => {
                    summary.failed += 1;
                    error!("{:?} => {err}", domain.method(method));
                }
            }
            self.patched.fetch_add(1, Ordering::Relaxed);
        }
        self.failed.fetch_add(summary.failed, Ordering::Relaxed);

        info!("Failed to patch {} methods", summary.failed);
        summary
    }

    /// Registers `method` and installs its rewritten body.
    pub fn apply(
        &self,
        domain: &Domain,
        patcher: &dyn MethodPatcher,
        method: MethodHandle,
        previously_patched: &HashSet<MethodHandle>,
    ) -> ProfilerResult<ApplyOutcome> {
        if !domain.contains_method(method) {
            return Err(ProfilerError::UnknownMethod(format!("{method:?}")));
        }
        let view = domain.method(method);
        if !view.has_body() {
            return Err(ProfilerError::MissingBody(view.display_name()));
        }
        let declaring = view.declaring_type();
        if domain.ty(declaring).info.generic.contains_generic_parameters() {
            return Err(ProfilerError::OpenGenericType(view.display_name()));
        }
        if let Some(ancestor) = domain
            .type_chain(declaring)
            .skip(1)
            .find(|ty| domain.ty(*ty).info.generic.contains_generic_parameters())
        {
            return Err(ProfilerError::OpenGenericAncestor {
                method: view.display_name(),
                ancestor: domain.full_name(ancestor),
            });
        }
        if previously_patched.contains(&method) {
            debug!(method = ?view, "already optimised, skipped");
            return Ok(ApplyOutcome::AlreadyOptimized);
        }

        if !self.registry.register(&view) {
            return Err(ProfilerError::RegistrationRejected(view.display_name()));
        }
        let record = self
            .registry
            .slot_of(method)
            .and_then(|slot| self.registry.record_ref(slot));
        let Some(record) = record else {
            warn!(method = ?view, "registered without a usable slot");
            return Err(ProfilerError::RegistrationRejected(view.display_name()));
        };
        let slot = record.slot();
        let probe = ProbeSite::new(record, self.disabled.clone());

        let mut instrumented = false;
        patcher.patch(method, &mut |current: &MethodBody| {
            let outcome = rewrite(current, &probe);
            instrumented = outcome.is_instrumented();
            outcome.into_body()
        })?;

        debug!(method = ?view, slot = slot.index(), instrumented, "patched");
        Ok(if instrumented {
            ApplyOutcome::Instrumented(slot)
        } else {
            ApplyOutcome::PassThrough(slot)
        })
    }

    /// Stops counter updates without removing any instrumentation.
    pub fn disable(&self) {
        self.disabled.set(true);
        info!("profiler disabled");
    }

    /// Zeroes every registered record.
    pub fn reset(&self) {
        self.registry.reset_all();
        info!(records = self.registry.registered_count(), "profiler metrics reset");
    }

    pub fn build_report(&self) -> Report {
        build_report(&self.registry, &self.report_options)
    }

    /// Builds the report, writing its text form to the log when `print` is set.
    pub fn report(&self, print: bool) -> Report {
        let report = self.build_report();
        if print {
            info!("\n{}", report.render());
        }
        report
    }

    /// Rendered report text, also logged when `print` is set.
    pub fn report_text(&self, print: bool) -> String {
        self.report(print).render()
    }
}

//=====================================================
// End of file
//=====================================================
