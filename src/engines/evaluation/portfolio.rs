use crate::{
    error::{AqnheError, Result},
    types::{Action, Direction, ExitReason, Trade},
};

pub struct Portfolio {
    pub cash: f64,
    pub commission: f64,
    pub position: Option<Position>,
    pub trades: Vec<Trade>,
    /// One entry per mark, starting with the initial capital.
    pub equity_curve: Vec<f64>,
    /// Market value of the open position at the last mark.
    pub position_value: f64,
}

pub struct Position {
    pub direction: Direction,
    pub entry_bar: usize,
    pub entry_price: f64,
    pub size: f64,
    pub entry_fees: f64,
}

impl Portfolio {
    pub fn new(initial_capital: f64, commission: f64) -> Self {
        Self {
            cash: initial_capital,
            commission,
            position: None,
            trades: Vec::new(),
            equity_curve: vec![initial_capital],
            position_value: 0.0,
        }
    }

    /// Act on the decision for `bar` at its closing `price`, then mark to market.
    ///
    /// An open position is kept while the action points the same way, closed when
    /// the action turns flat or reverses; a reversal opens the new side at once.
    pub fn process_bar(&mut self, bar: usize, action: Action, price: f64) -> Result<()> {
        let held = self.position.as_ref().map(|p| p.direction);
        if held.is_some() && held != action.direction() {
            self.close_position(bar, price, ExitReason::Signal)?;
        }
        if self.position.is_none() {
            match action {
                Action::Long { size } => self.open_position(bar, Direction::Long, size, price)?,
                Action::Short { size } => self.open_position(bar, Direction::Short, size, price)?,
                Action::Flat => {}
            }
        }

        self.mark_to_market(price)
    }

    /// Open a position worth `fraction` of current equity.
    pub fn open_position(&mut self, bar: usize, direction: Direction, fraction: f64, price: f64) -> Result<()> {
        if !(price > 0.0 && price.is_finite()) {
            return Err(AqnheError::BacktestError(format!("invalid price {} at bar {}", price, bar)));
        }
        if fraction <= 0.0 {
            return Ok(());
        }
        let notional = self.equity() * fraction;
        let quantity = notional / price;
        let fees = notional * self.commission;

        self.cash -= fees;
        match direction {
            Direction::Long => self.cash -= notional,
            Direction::Short => self.cash += notional, // Add proceeds from short sale
        }

        self.position = Some(Position {
            direction,
            entry_bar: bar,
            entry_price: price,
            size: quantity,
            entry_fees: fees,
        });
        self.position_value = notional;

        Ok(())
    }

    pub fn close_position(&mut self, bar: usize, price: f64, reason: ExitReason) -> Result<()> {
        if let Some(pos) = self.position.take() {
            let profit = match pos.direction {
                Direction::Long => (price - pos.entry_price) * pos.size,
                Direction::Short => (pos.entry_price - price) * pos.size,
            };
            let exit_fees = price * pos.size * self.commission;

            match pos.direction {
                Direction::Long => self.cash += price * pos.size,
                Direction::Short => self.cash -= price * pos.size, // Deduct cost to buy back shares
            }
            self.cash -= exit_fees;
            self.position_value = 0.0;

            self.trades.push(Trade {
                entry_bar: pos.entry_bar,
                exit_bar: bar,
                entry_price: pos.entry_price,
                exit_price: price,
                direction: pos.direction,
                size: pos.size,
                profit,
                exit_reason: reason,
                fees: pos.entry_fees + exit_fees,
            });
        }

        Ok(())
    }

    /// Close whatever is still open at the last bar and record the final equity.
    pub fn finish(&mut self, bar: usize, price: f64) -> Result<()> {
        self.close_position(bar, price, ExitReason::EndOfData)?;
        self.mark_to_market(price)
    }

    pub fn get_trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn get_equity_curve(&self) -> &[f64] {
        &self.equity_curve
    }

    /// Cash plus the signed market value of the open position.
    pub fn equity(&self) -> f64 {
        match &self.position {
            Some(p) if p.direction == Direction::Short => self.cash - self.position_value,
            Some(_) => self.cash + self.position_value,
            None => self.cash,
        }
    }

    /// Value the open position at `price` without recording a mark.
    pub fn revalue(&mut self, price: f64) {
        self.position_value = self.position.as_ref().map_or(0.0, |p| p.size * price);
    }

    fn mark_to_market(&mut self, price: f64) -> Result<()> {
        self.revalue(price);

        let equity = self.equity();
        if !equity.is_finite() {
            return Err(AqnheError::BacktestError("equity is not finite".to_string()));
        }
        self.equity_curve.push(equity);
        Ok(())
    }
}
