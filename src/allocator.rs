//! Aufteilungslogik für zwei kapazitätsbegrenzte Sammlungen.
//!
//! Dieses Modul implementiert eine gierige Heuristik, die jeden Namen aus zwei
//! Eingabesammlungen genau einer Seite zuordnet. Ablauf in vier Phasen:
//! - Klassifizierung nach Duplikat-Status (Pins bleiben unangetastet)
//! - Gierige Platzierung der verschiebbaren Duplikate in Namensreihenfolge
//! - Ausgleichsphase, falls eine Seite ihre Kapazität überschreitet
//! - Validierung von Gewichtserhaltung, Vollständigkeit und Pins

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::model::{AssignedItem, Bucket, Collection, Item, Origin, PinSet, PlacedItem, excess};
use crate::types::{MoveDirection, Side, approx_eq, compare_with_epsilon};

/// Konfiguration für den Aufteilungs-Algorithmus.
#[derive(Copy, Clone, Debug)]
pub struct AllocatorConfig {
    /// Allgemeine numerische Toleranz für Kapazitätsvergleiche
    pub general_epsilon: f64,
    /// Relative Toleranz der Gewichtserhaltungsprüfung
    pub conservation_tolerance: f64,
    /// Ob die Ausgleichsphase bei Überlauf ausgeführt wird
    pub rebalance: bool,
}

impl AllocatorConfig {
    pub const DEFAULT_GENERAL_EPSILON: f64 = crate::types::EPSILON_GENERAL;
    pub const DEFAULT_CONSERVATION_TOLERANCE: f64 = crate::types::EPSILON_CONSERVATION;
    pub const DEFAULT_REBALANCE: bool = true;

    /// Erstellt einen Builder für benutzerdefinierte Konfiguration.
    pub fn builder() -> AllocatorConfigBuilder {
        AllocatorConfigBuilder::default()
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            general_epsilon: Self::DEFAULT_GENERAL_EPSILON,
            conservation_tolerance: Self::DEFAULT_CONSERVATION_TOLERANCE,
            rebalance: Self::DEFAULT_REBALANCE,
        }
    }
}

/// Builder für AllocatorConfig.
#[derive(Clone, Debug, Default)]
pub struct AllocatorConfigBuilder {
    config: AllocatorConfig,
}

impl AllocatorConfigBuilder {
    /// Setzt die allgemeine Toleranz.
    pub fn general_epsilon(mut self, epsilon: f64) -> Self {
        self.config.general_epsilon = epsilon;
        self
    }

    /// Setzt die Toleranz der Erhaltungsprüfung.
    pub fn conservation_tolerance(mut self, tolerance: f64) -> Self {
        self.config.conservation_tolerance = tolerance;
        self
    }

    /// Aktiviert oder deaktiviert die Ausgleichsphase.
    pub fn rebalance(mut self, enabled: bool) -> Self {
        self.config.rebalance = enabled;
        self
    }

    /// Erstellt die finale Konfiguration.
    pub fn build(self) -> AllocatorConfig {
        self.config
    }
}

/// Eingabe einer Aufteilung.
///
/// Die Kapazität jeder Seite ist ihr natürliches Gesamtgewicht plus Spielraum (`slack`).
#[derive(Clone, Debug, Default)]
pub struct AllocationRequest {
    pub collection_a: Collection,
    pub collection_b: Collection,
    pub slack_a: f64,
    pub slack_b: f64,
    pub pinned: PinSet,
}

impl AllocationRequest {
    /// Anfrage ohne Spielraum und ohne Pins.
    pub fn new(collection_a: Collection, collection_b: Collection) -> Self {
        Self {
            collection_a,
            collection_b,
            ..Self::default()
        }
    }

    /// Setzt den Spielraum beider Seiten. Nicht-endliche Werte zählen als 0.
    pub fn with_slack(mut self, slack_a: f64, slack_b: f64) -> Self {
        self.slack_a = finite_or_zero(slack_a);
        self.slack_b = finite_or_zero(slack_b);
        self
    }

    /// Setzt absolute Kapazitäten, indem der Spielraum daraus abgeleitet wird.
    pub fn with_capacities(self, capacity_a: f64, capacity_b: f64) -> Self {
        let slack_a = capacity_a - self.collection_a.total_weight();
        let slack_b = capacity_b - self.collection_b.total_weight();
        self.with_slack(slack_a, slack_b)
    }

    /// Setzt die gepinnten Namen.
    pub fn with_pins(mut self, pinned: PinSet) -> Self {
        self.pinned = pinned;
        self
    }

    /// Kapazität einer Seite (natürliches Gesamtgewicht + Spielraum), begrenzt auf `[0, f64::MAX]`.
    pub fn capacity(&self, side: Side) -> f64 {
        let (collection, slack) = match side {
            Side::A => (&self.collection_a, self.slack_a),
            Side::B => (&self.collection_b, self.slack_b),
        };
        (collection.total_weight() + finite_or_zero(slack)).clamp(0.0, f64::MAX)
    }

    /// Summe aller Eingabegewichte beider Seiten.
    pub fn input_total(&self) -> f64 {
        self.collection_a.total_weight() + self.collection_b.total_weight()
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Verschiebung relativ zur natürlichen Platzierung.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct Move {
    pub name: String,
    pub direction: MoveDirection,
    /// Gewicht, das die Seite gewechselt hat
    pub weight: f64,
}

/// Endzustand einer Seite.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct SideSummary {
    pub side: Side,
    pub capacity: f64,
    pub total: f64,
    /// `max(0, total - capacity)`
    pub overflow: f64,
    pub items: BTreeMap<String, f64>,
}

/// Ergebnis der Aufteilung.
#[derive(Clone, Debug, PartialEq)]
pub struct AllocationResult {
    /// Alle Zuordnungen, sortiert nach Name und Seite
    pub assignment: Vec<AssignedItem>,
    pub side_a: SideSummary,
    pub side_b: SideSummary,
    pub is_valid: bool,
    /// Verschiebungen relativ zur natürlichen Platzierung, sortiert nach Name
    pub moves: Vec<Move>,
    pub input_total: f64,
}

impl AllocationResult {
    /// Zusammenfassung einer Seite.
    pub fn side(&self, side: Side) -> &SideSummary {
        match side {
            Side::A => &self.side_a,
            Side::B => &self.side_b,
        }
    }

    /// Überlauf einer Seite (0, wenn sie passt).
    pub fn overflow(&self, side: Side) -> f64 {
        self.side(side).overflow
    }

    /// Gesamtgewicht beider Seiten nach der Aufteilung.
    pub fn assigned_total(&self) -> f64 {
        self.side_a.total + self.side_b.total
    }

    /// Gibt die Anzahl der Verschiebungen zurück.
    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    /// Findet die Verschiebung eines Namens.
    pub fn move_of(&self, name: &str) -> Option<&Move> {
        self.moves.iter().find(|m| m.name == name)
    }

    /// Seite(n), auf denen ein Name gelandet ist.
    pub fn destinations_of(&self, name: &str) -> Vec<Side> {
        self.assignment
            .iter()
            .filter(|entry| entry.name == name)
            .map(|entry| entry.destination)
            .collect()
    }
}

/// Verletzung einer internen Invariante.
///
/// Ein solcher Fehler deutet auf einen Logikfehler hin, nicht auf ungültige
/// Daten. Nicht erfüllbare Kapazitäten sind kein Fehler, sondern
/// `is_valid = false` im Ergebnis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    #[error("weight conservation violated: expected total {expected}, assigned {actual}")]
    ConservationViolated { expected: f64, actual: f64 },
    #[error("item '{name}' appears {found} time(s) in the assignment, expected {expected}")]
    ItemCountMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("pinned item '{name}' left its original placement on side {side}")]
    PinnedItemMoved { name: String, side: Side },
}

/// Ereignisse während der Aufteilung, um Live-Visualisierung zu ermöglichen.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum AllocationEvent {
    /// Eingaben wurden klassifiziert.
    Classified {
        duplicates: usize,
        pinned: usize,
        unique: usize,
        capacity_a: f64,
        capacity_b: f64,
    },
    /// Ein verschiebbares Duplikat wurde platziert.
    ItemPlaced {
        name: String,
        side: Side,
        weight: f64,
        total: f64,
    },
    /// Nach der gierigen Phase läuft mindestens eine Seite über.
    RebalanceStarted { overflow_a: f64, overflow_b: f64 },
    /// Die Ausgleichsphase hat ein Element verschoben.
    ItemMoved {
        name: String,
        direction: MoveDirection,
        weight: f64,
        total_a: f64,
        total_b: f64,
    },
    /// Aufteilung abgeschlossen.
    Finished {
        is_valid: bool,
        moves: usize,
        overflow_a: f64,
        overflow_b: f64,
    },
}

/// Hauptfunktion zur Aufteilung mit Standardkonfiguration.
///
/// # Beispiel
/// ```
/// use split_it_now::allocator::{allocate, AllocationRequest};
/// use split_it_now::model::Collection;
/// use split_it_now::types::Side;
///
/// let a = Collection::from_pairs([("p", 3.0), ("q", 4.0)]).unwrap();
/// let b = Collection::from_pairs([("q", 2.0), ("r", 1.0)]).unwrap();
/// let request = AllocationRequest::new(a, b).with_capacities(20.0, 20.0);
///
/// let result = allocate(request).unwrap();
/// assert!(result.is_valid);
/// assert_eq!(result.side(Side::B).items.get("q"), Some(&6.0));
/// ```
pub fn allocate(request: AllocationRequest) -> Result<AllocationResult, AllocationError> {
    allocate_with_config(request, AllocatorConfig::default())
}

/// Aufteilung mit benutzerdefinierter Konfiguration.
pub fn allocate_with_config(
    request: AllocationRequest,
    config: AllocatorConfig,
) -> Result<AllocationResult, AllocationError> {
    allocate_with_progress(request, config, |_| {})
}

/// Aufteilung mit Live-Progress Callback.
///
/// Ruft für jeden wichtigen Schritt ein Callback auf (geeignet für SSE).
pub fn allocate_with_progress(
    request: AllocationRequest,
    config: AllocatorConfig,
    mut on_event: impl FnMut(&AllocationEvent),
) -> Result<AllocationResult, AllocationError> {
    let eps = config.general_epsilon;
    let mut buckets = BucketPair::new(request.capacity(Side::A), request.capacity(Side::B));

    // Phase 1: Klassifizierung und Vorbelegung mit festen Elementen
    let classes = classify(&request.collection_a, &request.collection_b, &request.pinned);
    classes.seed(&mut buckets);
    debug!(
        duplicates = classes.movable_duplicates.len(),
        pinned = classes.pinned_count(),
        unique = classes.unique.len(),
        load_a = buckets.a.load(),
        load_b = buckets.b.load(),
        "classified allocation input"
    );
    on_event(&AllocationEvent::Classified {
        duplicates: classes.movable_duplicates.len(),
        pinned: classes.pinned_count(),
        unique: classes.unique.len(),
        capacity_a: buckets.a.capacity,
        capacity_b: buckets.b.capacity,
    });

    // Phase 2: Gierige Platzierung in Namensreihenfolge
    let mut placement: BTreeMap<String, Side> = BTreeMap::new();
    for item in &classes.movable_duplicates {
        let weight = item.combined_weight();
        let side = choose_side(&buckets.a, &buckets.b, weight, eps);
        let bucket = buckets.get_mut(side);
        bucket.place(PlacedItem {
            name: item.name.clone(),
            weight,
            origin: Origin::Duplicate,
        });
        on_event(&AllocationEvent::ItemPlaced {
            name: item.name.clone(),
            side,
            weight,
            total: bucket.load(),
        });
        placement.insert(item.name.clone(), side);
    }
    for item in &classes.unique {
        if let Some(side) = item.natural_side() {
            placement.insert(item.name.clone(), side);
        }
    }

    // Phase 3: Ausgleich nur bei Überlauf
    if buckets.any_overflow(eps) {
        if config.rebalance {
            on_event(&AllocationEvent::RebalanceStarted {
                overflow_a: buckets.a.overflow(eps),
                overflow_b: buckets.b.overflow(eps),
            });
            rebalance(&mut buckets, &classes, &mut placement, eps, &mut on_event);
        } else {
            debug!("rebalancing disabled; keeping greedy placement");
        }
    }

    // Phase 4: Validierung
    if let Err(err) = verify(&request, &buckets, &config) {
        error!(error = %err, "allocation invariant violated");
        return Err(err);
    }

    let result = build_result(&request, &classes, buckets, &placement, eps);
    on_event(&AllocationEvent::Finished {
        is_valid: result.is_valid,
        moves: result.moves.len(),
        overflow_a: result.side_a.overflow,
        overflow_b: result.side_b.overflow,
    });
    Ok(result)
}

/// Beide Seiten einer Aufteilung.
#[derive(Clone, Debug)]
struct BucketPair {
    a: Bucket,
    b: Bucket,
}

impl BucketPair {
    fn new(capacity_a: f64, capacity_b: f64) -> Self {
        Self {
            a: Bucket::new(Side::A, capacity_a),
            b: Bucket::new(Side::B, capacity_b),
        }
    }

    fn get(&self, side: Side) -> &Bucket {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }

    fn get_mut(&mut self, side: Side) -> &mut Bucket {
        match side {
            Side::A => &mut self.a,
            Side::B => &mut self.b,
        }
    }

    fn total_overflow(&self, eps: f64) -> f64 {
        self.a.overflow(eps) + self.b.overflow(eps)
    }

    fn any_overflow(&self, eps: f64) -> bool {
        self.a.is_overflowing(eps) || self.b.is_overflowing(eps)
    }

    /// Gesamtüberlauf, falls `weight` von `from` auf die andere Seite wechselt.
    fn total_overflow_after_move(&self, from: Side, weight: f64, eps: f64) -> f64 {
        let source = self.get(from);
        let target = self.get(from.other());
        excess(source.load() - weight, source.capacity, eps)
            + excess(target.load() + weight, target.capacity, eps)
    }

    /// Verschiebt `name` von `from` auf die andere Seite.
    fn transfer(&mut self, name: &str, from: Side) -> Option<f64> {
        let item = self.get_mut(from).take(name)?;
        let weight = item.weight;
        self.get_mut(from.other()).place(item);
        Some(weight)
    }
}

/// Eingaben, aufgeteilt nach Duplikat- und Pin-Status.
#[derive(Debug, Default)]
struct Classification {
    movable_duplicates: Vec<Item>,
    pinned_duplicates: Vec<Item>,
    pinned_unique: Vec<Item>,
    unique: Vec<Item>,
}

impl Classification {
    fn pinned_count(&self) -> usize {
        self.pinned_duplicates.len() + self.pinned_unique.len()
    }

    /// Belegt die Seiten mit allem, was nicht gierig platziert wird.
    fn seed(&self, buckets: &mut BucketPair) {
        for item in &self.pinned_duplicates {
            for side in Side::BOTH {
                buckets.get_mut(side).place(PlacedItem {
                    name: item.name.clone(),
                    weight: item.weight_on(side),
                    origin: Origin::Pinned,
                });
            }
        }

        let fixed = self
            .pinned_unique
            .iter()
            .map(|item| (item, Origin::Pinned))
            .chain(self.unique.iter().map(|item| (item, Origin::Unique)));
        for (item, origin) in fixed {
            if let Some(side) = item.natural_side() {
                buckets.get_mut(side).place(PlacedItem {
                    name: item.name.clone(),
                    weight: item.weight_on(side),
                    origin,
                });
            }
        }
    }
}

/// Teilt alle Namen beider Sammlungen in Klassen ein.
///
/// Die Listen sind nach Namen sortiert, da die Namen aus einer geordneten Menge stammen.
fn classify(a: &Collection, b: &Collection, pinned: &PinSet) -> Classification {
    let names: BTreeSet<&str> = a.names().chain(b.names()).collect();
    let mut classes = Classification::default();

    for name in names {
        let item = Item::lookup(name, a, b);
        match (item.is_duplicate(), pinned.contains(name)) {
            (true, false) => classes.movable_duplicates.push(item),
            (true, true) => classes.pinned_duplicates.push(item),
            (false, true) => classes.pinned_unique.push(item),
            (false, false) => classes.unique.push(item),
        }
    }
    classes
}

/// Wählt die Seite für ein Duplikat mit kombiniertem Gewicht `weight`.
///
/// Passen beide Seiten, gewinnt der niedrigere Füllgrad danach; passt nur eine,
/// wird sie genommen; passt keine, gewinnt der kleinere Überlauf. Gleichstand → A.
fn choose_side(a: &Bucket, b: &Bucket, weight: f64, eps: f64) -> Side {
    let prefer_a = |score_a: f64, score_b: f64| {
        if compare_with_epsilon(score_a, score_b, eps) == Ordering::Greater {
            Side::B
        } else {
            Side::A
        }
    };

    match (a.can_fit(weight, eps), b.can_fit(weight, eps)) {
        (true, true) => prefer_a(
            a.fill_ratio_after(weight, eps),
            b.fill_ratio_after(weight, eps),
        ),
        (true, false) => Side::A,
        (false, true) => Side::B,
        (false, false) => prefer_a(
            a.overflow_after(weight, eps),
            b.overflow_after(weight, eps),
        ),
    }
}

/// Kandidat der Ausgleichsphase.
struct Candidate<'a> {
    name: &'a str,
    weight: f64,
}

/// Sortiert Kandidaten absteigend nach Gewicht, bei Gleichstand nach Name.
fn heaviest_first(mut candidates: Vec<Candidate<'_>>) -> Vec<Candidate<'_>> {
    candidates.sort_by(|x, y| {
        y.weight
            .partial_cmp(&x.weight)
            .unwrap_or(Ordering::Equal)
            .then_with(|| x.name.cmp(y.name))
    });
    candidates
}

/// Ausgleichsphase.
///
/// Erst werden Duplikate (schwerste zuerst) von einer überlaufenden Seite
/// verschoben, wenn das den Gesamtüberlauf strikt senkt oder die Zielseite
/// danach noch passt. Bleibt Überlauf, folgen ungepinnte Einzelstücke
/// (schwerste zuerst), solange die Zielseite Platz hat.
fn rebalance(
    buckets: &mut BucketPair,
    classes: &Classification,
    placement: &mut BTreeMap<String, Side>,
    eps: f64,
    on_event: &mut impl FnMut(&AllocationEvent),
) {
    let duplicates = heaviest_first(
        classes
            .movable_duplicates
            .iter()
            .map(|item| Candidate {
                name: &item.name,
                weight: item.combined_weight(),
            })
            .collect(),
    );
    let uniques = heaviest_first(
        classes
            .unique
            .iter()
            .map(|item| Candidate {
                name: &item.name,
                weight: item.combined_weight(),
            })
            .collect(),
    );

    let passes = [(duplicates.as_slice(), true), (uniques.as_slice(), false)];
    for (candidates, allow_overflow_reduction) in passes {
        for candidate in candidates {
            if !buckets.any_overflow(eps) {
                return;
            }
            if candidate.weight <= eps {
                continue;
            }
            let Some(&from) = placement.get(candidate.name) else {
                continue;
            };
            if !buckets.get(from).is_overflowing(eps) {
                continue;
            }

            let to = from.other();
            let receiver_fits = buckets.get(to).can_fit(candidate.weight, eps);
            let reduces_overflow = allow_overflow_reduction
                && buckets.total_overflow_after_move(from, candidate.weight, eps)
                    < buckets.total_overflow(eps) - eps;
            if !(receiver_fits || reduces_overflow) {
                continue;
            }

            if let Some(weight) = buckets.transfer(candidate.name, from) {
                placement.insert(candidate.name.to_string(), to);
                debug!(
                    name = candidate.name,
                    from = %from,
                    to = %to,
                    weight,
                    "rebalanced item"
                );
                on_event(&AllocationEvent::ItemMoved {
                    name: candidate.name.to_string(),
                    direction: MoveDirection::leaving(from),
                    weight,
                    total_a: buckets.a.load(),
                    total_b: buckets.b.load(),
                });
            }
        }
    }
}

/// Prüft die Invarianten nach der Aufteilung.
///
/// - Gewichtserhaltung: Summe beider Seiten == Summe der Eingaben
/// - Vollständigkeit: jeder Name genau einmal (gepinnte Duplikate je Seite einmal)
/// - Pins: gepinnte Namen mit unveränderter Seite und unverändertem Gewicht
fn verify(
    request: &AllocationRequest,
    buckets: &BucketPair,
    config: &AllocatorConfig,
) -> Result<(), AllocationError> {
    let expected = request.input_total();
    let actual = buckets.a.recomputed_load() + buckets.b.recomputed_load();
    if !approx_eq(expected, actual, config.conservation_tolerance) {
        return Err(AllocationError::ConservationViolated { expected, actual });
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for placed in buckets.a.placed().iter().chain(buckets.b.placed()) {
        *counts.entry(placed.name.as_str()).or_insert(0) += 1;
    }

    let a = &request.collection_a;
    let b = &request.collection_b;
    let names: BTreeSet<&str> = a.names().chain(b.names()).collect();
    for name in &names {
        let pinned = request.pinned.contains(name);
        let expected_count = if pinned && a.contains(name) && b.contains(name) {
            2
        } else {
            1
        };
        let found = counts.get(name).copied().unwrap_or(0);
        if found != expected_count {
            return Err(AllocationError::ItemCountMismatch {
                name: name.to_string(),
                expected: expected_count,
                found,
            });
        }

        if pinned {
            for side in Side::BOTH {
                let original = match side {
                    Side::A => a.get(name),
                    Side::B => b.get(name),
                };
                let kept = buckets.get(side).weight_of(name);
                let unchanged = match (original, kept) {
                    (None, None) => true,
                    (Some(before), Some(after)) => (before - after).abs() <= config.general_epsilon,
                    _ => false,
                };
                if !unchanged {
                    return Err(AllocationError::PinnedItemMoved {
                        name: name.to_string(),
                        side,
                    });
                }
            }
        }
    }

    if let Some((name, &found)) = counts.iter().find(|(name, _)| !names.contains(*name)) {
        return Err(AllocationError::ItemCountMismatch {
            name: name.to_string(),
            expected: 0,
            found,
        });
    }

    Ok(())
}

/// Baut das Ergebnis aus dem validierten Endzustand.
fn build_result(
    request: &AllocationRequest,
    classes: &Classification,
    buckets: BucketPair,
    placement: &BTreeMap<String, Side>,
    eps: f64,
) -> AllocationResult {
    let summarize = |bucket: &Bucket| {
        let total = bucket.recomputed_load();
        SideSummary {
            side: bucket.side,
            capacity: bucket.capacity,
            total,
            overflow: excess(total, bucket.capacity, eps),
            items: bucket.weights(),
        }
    };
    let side_a = summarize(&buckets.a);
    let side_b = summarize(&buckets.b);
    let is_valid = side_a.overflow == 0.0 && side_b.overflow == 0.0;

    let mut assignment: Vec<AssignedItem> = [&buckets.a, &buckets.b]
        .into_iter()
        .flat_map(|bucket| {
            bucket.placed().iter().map(move |placed| AssignedItem {
                name: placed.name.clone(),
                destination: bucket.side,
                weight: placed.weight,
                origin: placed.origin,
            })
        })
        .collect();
    assignment.sort_by(|x, y| {
        x.name
            .cmp(&y.name)
            .then_with(|| x.destination.cmp(&y.destination))
    });

    let mut moves = Vec::new();
    for item in &classes.movable_duplicates {
        if let Some(&side) = placement.get(&item.name) {
            moves.push(Move {
                name: item.name.clone(),
                direction: MoveDirection::towards(side),
                weight: item.weight_on(side.other()),
            });
        }
    }
    for item in &classes.unique {
        if let (Some(natural), Some(&side)) = (item.natural_side(), placement.get(&item.name)) {
            if natural != side {
                moves.push(Move {
                    name: item.name.clone(),
                    direction: MoveDirection::leaving(natural),
                    weight: item.weight_on(natural),
                });
            }
        }
    }
    moves.sort_by(|x, y| x.name.cmp(&y.name));

    AllocationResult {
        assignment,
        side_a,
        side_b,
        is_valid,
        moves,
        input_total: request.input_total(),
    }
}
