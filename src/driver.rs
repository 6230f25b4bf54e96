//! Multiplexed display driver for a row/column LED matrix.
//!
//! Current only flows from a row pin to a column pin, so a single cell is lit
//! by driving its column HIGH and leaving its row LOW. Every other row is
//! driven HIGH too, which leaves no potential difference across the other
//! cells of the active column. Only one cell can be lit this way at a time.
//! Showing several cells means cycling through them faster than the eye can
//! follow, which is what [`MatrixDriver::render_frame`] does.

use crate::error::MatrixError;
use crate::mapper::PinMapper;
use crate::output::OutputDriver;
use crate::{Coordinate, LogicalPin, is_running};
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::{Duration, Instant};

/// Slow passes logged individually before going quiet.
const SLOW_PASS_LOG_LIMIT: u32 = 5;

/// Extra time a pass may take over its refresh period before it counts as slow.
const SLOW_PASS_SLACK: Duration = Duration::from_millis(1);

// ── Topology ─────────────────────────────────────────────────────────

/// Which matrix pins drive which rows and columns.
///
/// `x` indexes the row pins and `y` the column pins, so the matrix is
/// `rows.len()` wide and `columns.len()` high.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinTopology {
    rows: Vec<LogicalPin>,
    columns: Vec<LogicalPin>,
}

impl PinTopology {
    pub fn new(rows: Vec<LogicalPin>, columns: Vec<LogicalPin>) -> Result<Self, MatrixError> {
        if rows.is_empty() || columns.is_empty() {
            return Err(MatrixError::InvalidTopology(
                "need at least one row pin and one column pin".to_string(),
            ));
        }

        let mut seen = std::collections::BTreeSet::new();
        if let Some(pin) = rows.iter().chain(&columns).find(|&&pin| !seen.insert(pin)) {
            return Err(MatrixError::InvalidTopology(format!(
                "pin {pin} is used more than once"
            )));
        }

        Ok(Self { rows, columns })
    }

    /// Header pinout of the common 5x7 matrix.
    pub fn standard_5x7() -> Self {
        Self {
            rows: vec![1, 3, 10, 7, 8],
            columns: vec![12, 11, 2, 9, 4, 5, 6],
        }
    }

    pub fn rows(&self) -> &[LogicalPin] {
        &self.rows
    }

    pub fn columns(&self) -> &[LogicalPin] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.rows.len()
    }

    pub fn height(&self) -> usize {
        self.columns.len()
    }

    /// Every pin in the matrix, rows first.
    pub fn pins(&self) -> Vec<LogicalPin> {
        self.rows.iter().chain(&self.columns).copied().collect()
    }

    pub fn contains(&self, coordinate: Coordinate) -> bool {
        coordinate.x < self.width() && coordinate.y < self.height()
    }

    fn check(&self, coordinate: Coordinate) -> Result<(), MatrixError> {
        if self.contains(coordinate) {
            Ok(())
        } else {
            Err(MatrixError::OutOfBounds {
                coordinate,
                width: self.width(),
                height: self.height(),
            })
        }
    }
}

impl Default for PinTopology {
    fn default() -> Self {
        Self::standard_5x7()
    }
}

// ── Frames ───────────────────────────────────────────────────────────

/// Cells that should appear lit together.
///
/// Keeps the order cells were first added in; that order is the render
/// order. Adding a cell twice has no effect.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayFrame {
    cells: Vec<Coordinate>,
}

impl DisplayFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell. Returns `false` if it was already in the frame.
    pub fn insert(&mut self, cell: Coordinate) -> bool {
        if self.cells.contains(&cell) {
            return false;
        }
        self.cells.push(cell);
        true
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Coordinate] {
        &self.cells
    }
}

impl FromIterator<Coordinate> for DisplayFrame {
    fn from_iter<I: IntoIterator<Item = Coordinate>>(iter: I) -> Self {
        let mut frame = Self::new();
        for cell in iter {
            frame.insert(cell);
        }
        frame
    }
}

// ── Timing ───────────────────────────────────────────────────────────

/// Refresh timing for multiplexed rendering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MultiplexConfig {
    refresh_hz: f64,
    period: Duration,
}

impl MultiplexConfig {
    pub const DEFAULT_REFRESH_HZ: f64 = 120.0;

    pub fn new(refresh_hz: f64) -> Result<Self, MatrixError> {
        if !refresh_hz.is_finite() || refresh_hz <= 0.0 {
            return Err(MatrixError::InvalidRefreshRate(refresh_hz));
        }
        let period = Duration::try_from_secs_f64(1.0 / refresh_hz)
            .map_err(|_| MatrixError::InvalidRefreshRate(refresh_hz))?;
        Ok(Self { refresh_hz, period })
    }

    pub fn refresh_hz(&self) -> f64 {
        self.refresh_hz
    }

    /// Time for one full pass over a frame.
    pub fn refresh_period(&self) -> Duration {
        self.period
    }

    /// How long each cell stays lit so a full pass takes one refresh period
    /// whatever the frame size.
    pub fn per_cell_interval(&self, frame_len: usize) -> Duration {
        self.refresh_period() / frame_len.max(1) as u32
    }
}

impl Default for MultiplexConfig {
    fn default() -> Self {
        Self {
            refresh_hz: Self::DEFAULT_REFRESH_HZ,
            period: Duration::from_nanos(8_333_333),
        }
    }
}

/// What a render loop did before it stopped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Completed passes over the whole frame.
    pub passes: u64,
    /// Cells lit, counting every pass.
    pub cells_lit: u64,
    pub elapsed: Duration,
}

// ── Driver ───────────────────────────────────────────────────────────

/// Lights cells of a matrix through a borrowed [`PinMapper`].
pub struct MatrixDriver<'a, O> {
    topology: PinTopology,
    mapper: &'a mut PinMapper<O>,
    config: MultiplexConfig,
}

impl<'a, O: OutputDriver> MatrixDriver<'a, O> {
    pub fn new(topology: PinTopology, mapper: &'a mut PinMapper<O>) -> Self {
        Self {
            topology,
            mapper,
            config: MultiplexConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MultiplexConfig) -> Self {
        self.config = config;
        self
    }

    pub fn topology(&self) -> &PinTopology {
        &self.topology
    }

    pub fn config(&self) -> MultiplexConfig {
        self.config
    }

    pub fn mapper(&self) -> &PinMapper<O> {
        &*self.mapper
    }

    /// Matrix pins that must be HIGH to light `cell`: its column, then every
    /// row except its own.
    pub fn high_pins(&self, cell: Coordinate) -> Result<Vec<LogicalPin>, MatrixError> {
        self.topology.check(cell)?;
        let sink = self.topology.rows[cell.x];

        let mut high = Vec::with_capacity(self.topology.width());
        high.push(self.topology.columns[cell.y]);
        high.extend(self.topology.rows.iter().copied().filter(|&pin| pin != sink));
        Ok(high)
    }

    /// Light exactly one cell.
    ///
    /// Blanks every bound pin first, then drives the HIGH set in one write.
    /// The cell and the bindings are checked before anything is written.
    pub fn light_one(&mut self, cell: Coordinate) -> Result<(), MatrixError> {
        let high = self.high_pins(cell)?;
        self.mapper.resolve(&self.topology.pins())?;
        self.light_unchecked(&high)
    }

    /// Blank, then drive an already validated HIGH set.
    fn light_unchecked(&mut self, high: &[LogicalPin]) -> Result<(), MatrixError> {
        self.mapper.blank()?;
        self.mapper.set_levels(high, true)
    }

    /// Turn every bound pin off.
    pub fn clear(&mut self) -> Result<(), MatrixError> {
        self.mapper.blank()
    }

    /// Multiplex `frame` so its cells appear lit at the same time.
    ///
    /// Each pass lights every cell once and takes one refresh period. With
    /// `hold` set, passes repeat until it has elapsed; the deadline is only
    /// checked between passes so each cell gets the same number of renders.
    /// With `hold` unset, passes repeat until `running` goes false. `running`
    /// is checked before every cell. The matrix is blanked when the loop
    /// stops. A write failure aborts the loop immediately.
    pub fn render_frame(
        &mut self,
        frame: &DisplayFrame,
        hold: Option<Duration>,
        running: &AtomicBool,
    ) -> Result<RenderReport, MatrixError> {
        let interval = self.config.per_cell_interval(frame.len());
        tracing::info!(
            cells = frame.len(),
            refresh_hz = self.config.refresh_hz,
            interval_us = interval.as_micros() as u64,
            "rendering frame"
        );
        self.cycle(frame, interval, hold, running, Some(self.config.refresh_period()))
    }

    /// Light each cell of `frame` on its own for `step`, one after another.
    ///
    /// Same stopping rules as [`render_frame`](Self::render_frame), without
    /// the refresh-rate timing.
    pub fn sweep(
        &mut self,
        frame: &DisplayFrame,
        step: Duration,
        hold: Option<Duration>,
        running: &AtomicBool,
    ) -> Result<RenderReport, MatrixError> {
        tracing::info!(
            cells = frame.len(),
            step_ms = step.as_millis() as u64,
            "sweeping frame"
        );
        self.cycle(frame, step, hold, running, None)
    }

    fn cycle(
        &mut self,
        frame: &DisplayFrame,
        interval: Duration,
        hold: Option<Duration>,
        running: &AtomicBool,
        period: Option<Duration>,
    ) -> Result<RenderReport, MatrixError> {
        let patterns = frame
            .cells()
            .iter()
            .map(|&cell| self.high_pins(cell))
            .collect::<Result<Vec<_>, _>>()?;
        self.mapper.resolve(&self.topology.pins())?;

        let start = Instant::now();
        let mut report = RenderReport::default();
        let mut slow_passes = 0u32;

        'render: loop {
            let pass_start = Instant::now();

            if frame.is_empty() {
                if !is_running(running) {
                    break 'render;
                }
                self.mapper.blank()?;
                thread::sleep(interval);
            }

            for high in &patterns {
                if !is_running(running) {
                    break 'render;
                }
                self.light_unchecked(high)?;
                report.cells_lit += 1;
                thread::sleep(interval);
            }
            report.passes += 1;

            if let Some(period) = period {
                let pass_time = pass_start.elapsed();
                if pass_time > period + SLOW_PASS_SLACK {
                    slow_passes += 1;
                    if slow_passes <= SLOW_PASS_LOG_LIMIT {
                        tracing::warn!(
                            pass = report.passes,
                            took_us = pass_time.as_micros() as u64,
                            target_us = period.as_micros() as u64,
                            "refresh pass overran"
                        );
                    }
                }
            }

            if hold.is_some_and(|hold| start.elapsed() >= hold) {
                break;
            }
        }

        self.mapper.blank()?;
        report.elapsed = start.elapsed();

        if slow_passes > 0 {
            tracing::warn!(
                slow_passes,
                passes = report.passes,
                "some refresh passes overran"
            );
        }
        tracing::info!(
            passes = report.passes,
            cells_lit = report.cells_lit,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "render stopped"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::NumberingScheme;
    use crate::output::{SimulatedOutput, WriteRecord};
    use crate::PhysicalPin;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::atomic::Ordering;

    /// Line used for matrix pin `pin` in the 5x7 fixtures.
    fn line_for(pin: LogicalPin) -> PhysicalPin {
        pin + 20
    }

    fn bound_5x7() -> PinMapper<SimulatedOutput> {
        let mut mapper = PinMapper::new(SimulatedOutput::new(), NumberingScheme::Bcm);
        for pin in PinTopology::standard_5x7().pins() {
            mapper.bind(pin, line_for(pin)).unwrap();
        }
        mapper
    }

    /// The reference 2x2 wiring: rows 1 and 3, columns 12 and 11.
    fn bound_2x2() -> (PinTopology, PinMapper<SimulatedOutput>) {
        let topology = PinTopology::new(vec![1, 3], vec![12, 11]).unwrap();
        let mut mapper = PinMapper::new(SimulatedOutput::new(), NumberingScheme::Bcm);
        mapper.bind(1, 17).unwrap();
        mapper.bind(3, 18).unwrap();
        mapper.bind(12, 22).unwrap();
        mapper.bind(11, 23).unwrap();
        (topology, mapper)
    }

    fn cells(coords: &[(usize, usize)]) -> DisplayFrame {
        coords.iter().map(|&(x, y)| Coordinate::new(x, y)).collect()
    }

    // ── Topology ───────────────────────────────────────────────────

    #[test]
    fn standard_topology_is_5_wide_7_high() {
        let topology = PinTopology::standard_5x7();
        assert_eq!(topology.width(), 5);
        assert_eq!(topology.height(), 7);
        assert_eq!(topology.pins().len(), 12);
    }

    #[rstest]
    #[case(vec![], vec![12])]
    #[case(vec![1], vec![])]
    #[case(vec![1, 1], vec![12])]
    #[case(vec![1, 3], vec![12, 3])]
    fn invalid_topologies_are_rejected(
        #[case] rows: Vec<LogicalPin>,
        #[case] columns: Vec<LogicalPin>,
    ) {
        let err = PinTopology::new(rows, columns).unwrap_err();
        assert!(matches!(err, MatrixError::InvalidTopology(_)));
    }

    // ── Frames and timing ──────────────────────────────────────────

    #[test]
    fn frame_keeps_first_insertion_order_and_drops_duplicates() {
        let frame = cells(&[(1, 1), (0, 0), (1, 1), (0, 1)]);
        assert_eq!(
            frame.cells(),
            &[
                Coordinate::new(1, 1),
                Coordinate::new(0, 0),
                Coordinate::new(0, 1)
            ]
        );
    }

    #[rstest]
    #[case(0.0)]
    #[case(-60.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[case(1e-20)]
    fn bad_refresh_rates_are_rejected(#[case] hz: f64) {
        assert!(matches!(
            MultiplexConfig::new(hz),
            Err(MatrixError::InvalidRefreshRate(_))
        ));
    }

    #[test]
    fn default_config_matches_120_hz() {
        assert_eq!(MultiplexConfig::default(), MultiplexConfig::new(120.0).unwrap());
    }

    #[rstest]
    #[case(0, 8333)]
    #[case(1, 8333)]
    #[case(2, 4166)]
    #[case(4, 2083)]
    fn per_cell_interval_shrinks_with_frame_size(#[case] len: usize, #[case] micros: u128) {
        let config = MultiplexConfig::default();
        assert_eq!(config.per_cell_interval(len).as_micros(), micros);
    }

    // ── light_one ──────────────────────────────────────────────────

    #[rstest]
    fn light_one_drives_expected_pattern(
        #[values(0, 1, 2, 3, 4)] x: usize,
        #[values(0, 1, 2, 3, 4, 5, 6)] y: usize,
    ) {
        let topology = PinTopology::standard_5x7();
        let mut mapper = bound_5x7();
        let mut driver = MatrixDriver::new(topology.clone(), &mut mapper);

        driver.light_one(Coordinate::new(x, y)).unwrap();
        let out = driver.mapper().output();

        let high_columns: Vec<usize> = (0..topology.height())
            .filter(|&i| out.level(line_for(topology.columns()[i])) == Some(true))
            .collect();
        let low_rows: Vec<usize> = (0..topology.width())
            .filter(|&i| out.level(line_for(topology.rows()[i])) == Some(false))
            .collect();

        assert_eq!(high_columns, vec![y]);
        assert_eq!(low_rows, vec![x]);
        assert_eq!(out.high_lines().len(), topology.width());
    }

    #[test]
    fn reference_wiring_lights_origin() {
        let (topology, mut mapper) = bound_2x2();
        let mut driver = MatrixDriver::new(topology, &mut mapper);

        driver.light_one(Coordinate::new(0, 0)).unwrap();

        let out = driver.mapper().output();
        assert_eq!(out.high_lines(), vec![18, 22]);
        assert_eq!(out.level(17), Some(false));
        assert_eq!(out.level(23), Some(false));
    }

    #[test]
    fn reference_wiring_lights_far_corner() {
        let (topology, mut mapper) = bound_2x2();
        let mut driver = MatrixDriver::new(topology, &mut mapper);

        driver.light_one(Coordinate::new(0, 0)).unwrap();
        driver.light_one(Coordinate::new(1, 1)).unwrap();

        let out = driver.mapper().output();
        assert_eq!(out.high_lines(), vec![17, 23]);
        assert_eq!(out.level(18), Some(false));
        assert_eq!(out.level(22), Some(false));
    }

    #[test]
    fn light_one_blanks_then_sets_in_two_bulk_writes() {
        let (topology, mut mapper) = bound_2x2();
        let mut driver = MatrixDriver::new(topology, &mut mapper);

        driver.light_one(Coordinate::new(1, 0)).unwrap();

        assert_eq!(
            driver.mapper().output().writes(),
            &[
                WriteRecord {
                    lines: vec![17, 18, 23, 22],
                    high: false
                },
                WriteRecord {
                    lines: vec![22, 17],
                    high: true
                },
            ]
        );
    }

    #[test]
    fn light_one_twice_matches_once() {
        let mut once = bound_5x7();
        MatrixDriver::new(PinTopology::standard_5x7(), &mut once)
            .light_one(Coordinate::new(2, 3))
            .unwrap();

        let mut twice = bound_5x7();
        let mut driver = MatrixDriver::new(PinTopology::standard_5x7(), &mut twice);
        driver.light_one(Coordinate::new(2, 3)).unwrap();
        driver.light_one(Coordinate::new(2, 3)).unwrap();

        assert_eq!(once.output().high_lines(), twice.output().high_lines());
    }

    #[test]
    fn no_stale_pin_survives_a_new_cell() {
        let mut mapper = bound_5x7();
        let mut driver = MatrixDriver::new(PinTopology::standard_5x7(), &mut mapper);

        for (x, y) in [(0, 0), (4, 6), (2, 3), (4, 0)] {
            let cell = Coordinate::new(x, y);
            driver.light_one(cell).unwrap();

            let mut expected: Vec<PhysicalPin> = driver
                .high_pins(cell)
                .unwrap()
                .into_iter()
                .map(line_for)
                .collect();
            expected.sort_unstable();
            assert_eq!(driver.mapper().output().high_lines(), expected);
        }
    }

    #[test]
    fn light_one_without_bindings_writes_nothing() {
        let mut mapper = PinMapper::new(SimulatedOutput::new(), NumberingScheme::Bcm);
        let mut driver = MatrixDriver::new(PinTopology::standard_5x7(), &mut mapper);

        let err = driver.light_one(Coordinate::new(0, 0)).unwrap_err();

        assert!(matches!(err, MatrixError::UnknownLogicalPin(_)));
        assert!(driver.mapper().output().writes().is_empty());
    }

    #[test]
    fn partially_bound_topology_is_rejected_before_blanking() {
        let (_, mut mapper) = bound_2x2();
        let mut driver = MatrixDriver::new(PinTopology::standard_5x7(), &mut mapper);

        let err = driver.light_one(Coordinate::new(0, 0)).unwrap_err();

        assert!(matches!(err, MatrixError::UnknownLogicalPin(10)));
        assert!(driver.mapper().output().writes().is_empty());
    }

    #[rstest]
    #[case::nothing_bound(vec![])]
    #[case::corner_only(vec![(1, 17), (3, 18), (12, 22), (11, 23)])]
    fn render_and_sweep_need_every_pin_bound(#[case] bindings: Vec<(LogicalPin, PhysicalPin)>) {
        let mut mapper = PinMapper::new(SimulatedOutput::new(), NumberingScheme::Bcm);
        for (pin, line) in bindings {
            mapper.bind(pin, line).unwrap();
        }
        let mut driver = MatrixDriver::new(PinTopology::standard_5x7(), &mut mapper);
        let frame = cells(&[(0, 0), (1, 1)]);
        let running = AtomicBool::new(true);

        let err = driver
            .render_frame(&frame, Some(Duration::ZERO), &running)
            .unwrap_err();
        assert!(matches!(err, MatrixError::UnknownLogicalPin(_)));

        let err = driver
            .sweep(&frame, Duration::from_millis(1), Some(Duration::ZERO), &running)
            .unwrap_err();
        assert!(matches!(err, MatrixError::UnknownLogicalPin(_)));

        assert!(driver.mapper().output().writes().is_empty());
    }

    #[rstest]
    #[case(5, 0)]
    #[case(0, 7)]
    fn out_of_bounds_cell_is_rejected(#[case] x: usize, #[case] y: usize) {
        let mut mapper = bound_5x7();
        let mut driver = MatrixDriver::new(PinTopology::standard_5x7(), &mut mapper);

        let err = driver.light_one(Coordinate::new(x, y)).unwrap_err();

        assert!(matches!(
            err,
            MatrixError::OutOfBounds {
                width: 5,
                height: 7,
                ..
            }
        ));
        assert!(driver.mapper().output().writes().is_empty());
    }

    #[test]
    fn rebound_row_leaves_no_stale_line_lit() {
        let (topology, mut mapper) = bound_2x2();
        MatrixDriver::new(topology.clone(), &mut mapper)
            .light_one(Coordinate::new(1, 0))
            .unwrap();
        assert_eq!(mapper.output().level(17), Some(true));

        mapper.bind(1, 27).unwrap();
        let mut driver = MatrixDriver::new(topology, &mut mapper);
        driver.light_one(Coordinate::new(0, 0)).unwrap();
        driver.clear().unwrap();

        assert!(driver.mapper().output().high_lines().is_empty());
    }

    #[test]
    fn clear_turns_everything_off() {
        let (topology, mut mapper) = bound_2x2();
        let mut driver = MatrixDriver::new(topology, &mut mapper);
        driver.light_one(Coordinate::new(0, 1)).unwrap();

        driver.clear().unwrap();

        assert!(driver.mapper().output().high_lines().is_empty());
    }

    // ── render_frame ───────────────────────────────────────────────

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(5)]
    fn one_pass_takes_one_refresh_period(#[case] len: usize) {
        let mut mapper = bound_5x7();
        let config = MultiplexConfig::new(50.0).unwrap();
        let mut driver =
            MatrixDriver::new(PinTopology::standard_5x7(), &mut mapper).with_config(config);
        let frame: DisplayFrame = (0..len).map(|x| Coordinate::new(x, x)).collect();
        let running = AtomicBool::new(true);

        let report = driver
            .render_frame(&frame, Some(Duration::ZERO), &running)
            .unwrap();

        assert_eq!(report.passes, 1);
        assert_eq!(report.cells_lit, len as u64);
        assert!(report.elapsed >= Duration::from_millis(19), "{:?}", report.elapsed);
        assert!(report.elapsed < Duration::from_millis(40), "{:?}", report.elapsed);
    }

    #[test]
    fn reference_frame_renders_each_cell_about_120_times_a_second() {
        let (topology, mut mapper) = bound_2x2();
        let mut driver = MatrixDriver::new(topology, &mut mapper);
        let frame = cells(&[(0, 0), (1, 1)]);
        let running = AtomicBool::new(true);

        let report = driver
            .render_frame(&frame, Some(Duration::from_secs(1)), &running)
            .unwrap();

        assert!((90..=121).contains(&report.passes), "{report:?}");
        assert_eq!(report.cells_lit, report.passes * 2);
    }

    #[test]
    fn render_alternates_cells_in_frame_order() {
        let (topology, mut mapper) = bound_2x2();
        let config = MultiplexConfig::new(1000.0).unwrap();
        let mut driver = MatrixDriver::new(topology, &mut mapper).with_config(config);
        let frame = cells(&[(1, 1), (0, 0)]);
        let running = AtomicBool::new(true);

        driver
            .render_frame(&frame, Some(Duration::ZERO), &running)
            .unwrap();

        let highs: Vec<Vec<PhysicalPin>> = driver
            .mapper()
            .output()
            .writes()
            .iter()
            .filter(|w| w.high)
            .map(|w| w.lines.clone())
            .collect();
        assert_eq!(highs, vec![vec![23, 17], vec![22, 18]]);
        assert!(driver.mapper().output().high_lines().is_empty());
    }

    #[test]
    fn stopped_flag_renders_nothing() {
        let (topology, mut mapper) = bound_2x2();
        let mut driver = MatrixDriver::new(topology, &mut mapper);
        let running = AtomicBool::new(false);

        let report = driver
            .render_frame(&cells(&[(0, 0)]), None, &running)
            .unwrap();

        assert_eq!(report.passes, 0);
        assert_eq!(report.cells_lit, 0);
        assert!(driver.mapper().output().writes().iter().all(|w| !w.high));
    }

    #[test]
    fn unbounded_render_stops_when_cancelled() {
        let (topology, mut mapper) = bound_2x2();
        let mut driver = MatrixDriver::new(topology, &mut mapper);
        let frame = cells(&[(0, 0), (1, 1)]);
        let running = AtomicBool::new(true);

        let report = thread::scope(|s| {
            s.spawn(|| {
                thread::sleep(Duration::from_millis(50));
                running.store(false, Ordering::SeqCst);
            });
            driver.render_frame(&frame, None, &running).unwrap()
        });

        assert!(report.cells_lit > 0);
        assert!(report.elapsed < Duration::from_secs(1));
        assert!(driver.mapper().output().high_lines().is_empty());
    }

    #[test]
    fn empty_frame_keeps_matrix_dark() {
        let (topology, mut mapper) = bound_2x2();
        let mut driver = MatrixDriver::new(topology, &mut mapper);
        let running = AtomicBool::new(true);

        let report = driver
            .render_frame(&DisplayFrame::new(), Some(Duration::from_millis(20)), &running)
            .unwrap();

        assert!(report.passes >= 1);
        assert_eq!(report.cells_lit, 0);
        assert!(driver.mapper().output().writes().iter().all(|w| !w.high));
    }

    #[test]
    fn write_failure_aborts_without_retry() {
        let topology = PinTopology::new(vec![1, 3], vec![12, 11]).unwrap();
        let mut mapper = PinMapper::new(
            SimulatedOutput::new().fail_writes_after(3),
            NumberingScheme::Bcm,
        );
        for (pin, line) in [(1, 17), (3, 18), (12, 22), (11, 23)] {
            mapper.bind(pin, line).unwrap();
        }
        let mut driver = MatrixDriver::new(topology, &mut mapper);
        let running = AtomicBool::new(true);

        let err = driver
            .render_frame(&cells(&[(0, 0), (1, 1)]), None, &running)
            .unwrap_err();

        assert!(matches!(err, MatrixError::Write { .. }));
        assert_eq!(driver.mapper().output().writes().len(), 3);
    }

    #[test]
    fn out_of_bounds_frame_is_rejected_up_front() {
        let (topology, mut mapper) = bound_2x2();
        let mut driver = MatrixDriver::new(topology, &mut mapper);
        let running = AtomicBool::new(true);

        let err = driver
            .render_frame(&cells(&[(0, 0), (2, 0)]), None, &running)
            .unwrap_err();

        assert!(matches!(err, MatrixError::OutOfBounds { .. }));
        assert!(driver.mapper().output().writes().is_empty());
    }

    // ── sweep ──────────────────────────────────────────────────────

    #[test]
    fn sweep_lights_each_cell_for_its_step() {
        let (topology, mut mapper) = bound_2x2();
        let mut driver = MatrixDriver::new(topology, &mut mapper);
        let frame = cells(&[(0, 0), (1, 0), (0, 1), (1, 1)]);
        let running = AtomicBool::new(true);

        let report = driver
            .sweep(&frame, Duration::from_millis(5), Some(Duration::ZERO), &running)
            .unwrap();

        assert_eq!(report.passes, 1);
        assert_eq!(report.cells_lit, 4);
        assert!(report.elapsed >= Duration::from_millis(20));
    }
}
