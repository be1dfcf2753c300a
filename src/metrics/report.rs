//=====================================================
// File: metrics/report.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Ranked views over collected method metrics
// Objective: Sort registered records five ways and render plain text
//=====================================================

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::registry::{InstrumentationRegistry, Slot};

use super::MetricsSnapshot;

/// Knobs for [`build_report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// Entries listed per section.
    pub top: usize,
    /// Methods at or below this many invocations are left out of the
    /// average-ticks ranking.
    pub min_invocations_for_average: u32,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top: 11,
            min_invocations_for_average: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Ranking {
    Invocations,
    TotalTicks,
    AverageTicks,
    MaxTicks,
    TotalMemory,
}

impl Ranking {
    pub const ALL: [Ranking; 5] = [
        Ranking::Invocations,
        Ranking::TotalTicks,
        Ranking::AverageTicks,
        Ranking::MaxTicks,
        Ranking::TotalMemory,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Ranking::Invocations => "Invocation count: ",
            Ranking::TotalTicks => "Tick count: ",
            Ranking::AverageTicks => "Ticks per invoke:",
            Ranking::MaxTicks => "Max ticks:",
            Ranking::TotalMemory => "Memory Allocated:",
        }
    }

    pub fn value(self, metrics: &MetricsSnapshot) -> u32 {
        match self {
            Ranking::Invocations => metrics.invocations,
            Ranking::TotalTicks => metrics.total_ticks,
            Ranking::AverageTicks => metrics.avg_ticks(),
            Ranking::MaxTicks => metrics.max_ticks,
            Ranking::TotalMemory => metrics.total_memory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub slot: Slot,
    pub method: String,
    pub label: String,
    pub value: u32,
    pub metrics: MetricsSnapshot,
}

impl ReportEntry {
    fn render(&self, ranking: Ranking) -> String {
        match ranking {
            Ranking::Invocations | Ranking::TotalTicks => format!(
                "{} - {} - Avg. Ticks Per: {}",
                self.label,
                self.value,
                self.metrics.avg_ticks()
            ),
            _ => format!(
                "{} - {} - Invocation count: {}",
                self.label, self.value, self.metrics.invocations
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    pub ranking: Ranking,
    pub entries: Vec<ReportEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub registered: usize,
    pub sections: Vec<ReportSection>,
}

impl Report {
    pub fn section(&self, ranking: Ranking) -> Option<&ReportSection> {
        self.sections
            .iter()
            .find(|section| section.ranking == ranking)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (index, section) in self.sections.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "{}", section.ranking.title());
            for entry in &section.entries {
                let _ = writeln!(out, "{}", entry.render(section.ranking));
            }
        }
        out
    }
}

/// Ranks every registered slot. Values are read live, so the result is an
/// approximate snapshot when instrumented methods run concurrently.
pub fn build_report(registry: &InstrumentationRegistry, options: &ReportOptions) -> Report {
    let entries: Vec<(Slot, String, MetricsSnapshot)> = registry
        .slots()
        .filter_map(|slot| {
            let record = registry.store().record(slot)?;
            let method = registry
                .name_of(slot)
                .unwrap_or_else(|| format!("<slot {}>", slot.index()));
            Some((slot, method, record.snapshot()))
        })
        .collect();

    let sections = Ranking::ALL
        .iter()
        .map(|ranking| rank(*ranking, &entries, options))
        .collect();

    Report {
        registered: entries.len(),
        sections,
    }
}

fn rank(
    ranking: Ranking,
    entries: &[(Slot, String, MetricsSnapshot)],
    options: &ReportOptions,
) -> ReportSection {
    let mut ranked: Vec<_> = entries
        .iter()
        .filter(|(_, _, metrics)| {
            ranking != Ranking::AverageTicks
                || metrics.invocations > options.min_invocations_for_average
        })
        .collect();
    // `sort_by` is stable: equal values keep slot order.
    ranked.sort_by(|a, b| ranking.value(&b.2).cmp(&ranking.value(&a.2)));
    let entries = ranked
        .into_iter()
        .take(options.top)
        .map(|(slot, method, metrics)| ReportEntry {
            slot: *slot,
            method: method.clone(),
            label: short_label(method),
            value: ranking.value(metrics),
            metrics: *metrics,
        })
        .collect();
    ReportSection { ranking, entries }
}

/// Drops the namespace from `Namespace.Type.Method`, keeping `Type.Method`.
pub fn short_label(method: &str) -> String {
    let mut segments = method.rsplitn(3, '.');
    match (segments.next(), segments.next()) {
        (Some(name), Some(ty)) => format!("{ty}.{name}"),
        _ => method.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyBuilder, Opcode};
    use crate::metrics::Counter;
    use crate::reflect::{Domain, MethodInfo, TypeInfo};

    fn registry_with(invocations: &[u32]) -> InstrumentationRegistry {
        let mut domain = Domain::new();
        let game = domain.add_module("Assembly-CSharp");
        let ty = domain.add_type(TypeInfo::new(game, Some("Game.World"), "Spawner"));
        let registry = InstrumentationRegistry::with_capacity(64);
        for (index, count) in invocations.iter().enumerate() {
            let mut builder = BodyBuilder::new();
            builder.emit(Opcode::Return);
            let method = domain.add_method(
                ty,
                MethodInfo::new(format!("Tick{index}")).with_body(builder.finish()),
            );
            assert!(registry.register(&domain.method(method)));
            let record = registry
                .store()
                .record(Slot::new(index as u32))
                .expect("slot in range");
            record.set(Counter::Invocations, *count);
            record.set(Counter::TotalTicks, count * (index as u32 + 1) * 10);
        }
        registry
    }

    #[test]
    fn average_ranking_ignores_rarely_called_methods() {
        let registry = registry_with(&[50, 3, 12]);
        let report = build_report(&registry, &ReportOptions::default());
        let average = report.section(Ranking::AverageTicks).expect("section");
        let slots: Vec<_> = average.entries.iter().map(|entry| entry.slot.index()).collect();
        assert_eq!(slots, vec![2, 0]);

        let invocations = report.section(Ranking::Invocations).expect("section");
        assert_eq!(invocations.entries.len(), 3);
    }

    #[test]
    fn sections_keep_top_eleven_in_descending_order() {
        let counts: Vec<u32> = (1..=20).collect();
        let registry = registry_with(&counts);
        let report = build_report(&registry, &ReportOptions::default());
        let section = report.section(Ranking::Invocations).expect("section");
        let values: Vec<_> = section.entries.iter().map(|entry| entry.value).collect();
        assert_eq!(values, (10..=20).rev().collect::<Vec<_>>());
    }

    #[test]
    fn ties_keep_slot_order() {
        let registry = registry_with(&[4, 9, 4, 4]);
        let report = build_report(&registry, &ReportOptions::default());
        let memory = report.section(Ranking::TotalMemory).expect("section");
        let slots: Vec<_> = memory.entries.iter().map(|entry| entry.slot.index()).collect();
        assert_eq!(slots, vec![0, 1, 2, 3]);
        let invocations = report.section(Ranking::Invocations).expect("section");
        let slots: Vec<_> = invocations.entries.iter().map(|entry| entry.slot.index()).collect();
        assert_eq!(slots, vec![1, 0, 2, 3]);
    }

    #[test]
    fn rendering_follows_section_layout() {
        let registry = registry_with(&[12]);
        let text = build_report(&registry, &ReportOptions::default()).render();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Invocation count: ");
        assert_eq!(lines[1], "Spawner.Tick0 - 12 - Avg. Ticks Per: 10");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "Tick count: ");
        assert!(text.contains("Ticks per invoke:\nSpawner.Tick0 - 10 - Invocation count: 12"));
        assert!(text.ends_with("Memory Allocated:\nSpawner.Tick0 - 0 - Invocation count: 12\n"));
    }

    #[test]
    fn short_labels_drop_the_namespace() {
        assert_eq!(short_label("Game.World.Spawner.Tick"), "Spawner.Tick");
        assert_eq!(short_label("Spawner.Tick"), "Spawner.Tick");
        assert_eq!(short_label("Tick"), "Tick");
    }
}

//=====================================================
// End of file
//=====================================================
