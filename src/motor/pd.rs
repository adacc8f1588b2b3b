// Proportional-derivative position controller
//
// The derivative term is fed the live velocity estimate instead of a
// differenced error, so there is no second differentiation of a noisy signal.

/// Output limit; the caller scales this by the motor's max current
pub const OUTPUT_LIMIT: f64 = 1.0;

/// PD controller producing a normalized command in [-1, 1]
#[derive(Debug, Clone, Default)]
pub struct PdController {
    kp: f64,
    kd: f64,

    // Values from the last compute_command, for debugging
    command: f64,
    error: f64,
    error_deriv: f64,
    p_term: f64,
    d_term: f64,
}

impl PdController {
    pub fn new(kp: f64, kd: f64) -> Self {
        Self {
            kp,
            kd,
            ..Self::default()
        }
    }

    /// Update gains. Applies from the next `compute_command`.
    pub fn set_gains(&mut self, kp: f64, kd: f64) {
        self.kp = kp;
        self.kd = kd;
    }

    pub fn gains(&self) -> (f64, f64) {
        (self.kp, self.kd)
    }

    /// Compute a command from a position error (target - current, degrees)
    /// and the measured velocity (deg/s).
    ///
    /// Moving towards the target shrinks the error, so the error derivative
    /// is the negated velocity.
    pub fn compute_command(&mut self, error: f64, velocity: f64) -> f64 {
        self.error = error;
        self.error_deriv = -velocity;

        self.p_term = self.kp * self.error;
        self.d_term = self.kd * self.error_deriv;

        self.command = (self.p_term + self.d_term).clamp(-OUTPUT_LIMIT, OUTPUT_LIMIT);
        self.command
    }

    pub fn get_command(&self) -> f64 {
        self.command
    }

    pub fn get_error(&self) -> f64 {
        self.error
    }

    pub fn get_error_deriv(&self) -> f64 {
        self.error_deriv
    }

    /// (P term, D term) from the last update, before clamping
    pub fn get_error_terms(&self) -> (f64, f64) {
        (self.p_term, self.d_term)
    }
}
