use aqnhe::engines::evaluation::Portfolio;
use aqnhe::engines::metrics::RiskMetrics;
use aqnhe::types::{Action, Direction, ExitReason};

#[test]
fn test_long_position_marked_to_market() {
    let mut portfolio = Portfolio::new(10000.0, 0.0);

    // 10% of equity ($1000) at $50 buys 20 units.
    portfolio.open_position(0, Direction::Long, 0.1, 50.0).unwrap();
    assert_eq!(portfolio.equity(), 10000.0);

    portfolio.revalue(55.0);

    assert_eq!(portfolio.position_value, 1100.0);
    assert_eq!(portfolio.equity(), 10100.0);
}

#[test]
fn test_short_position_gains_when_price_falls() {
    let mut portfolio = Portfolio::new(10000.0, 0.0);

    // Short 10 units at $100; sale proceeds are added to cash.
    portfolio.open_position(0, Direction::Short, 0.1, 100.0).unwrap();
    assert_eq!(portfolio.cash, 11000.0);
    assert_eq!(portfolio.equity(), 10000.0);

    portfolio.revalue(90.0);
    assert_eq!(portfolio.equity(), 10100.0);

    portfolio.close_position(1, 90.0, ExitReason::Signal).unwrap();
    assert_eq!(portfolio.cash, 10100.0);
    assert_eq!(portfolio.equity(), 10100.0);
    assert_eq!(portfolio.get_trades()[0].profit, 100.0);
}

#[test]
fn test_equity_curve_records_open_losses() {
    let mut portfolio = Portfolio::new(10000.0, 0.0);

    portfolio.open_position(0, Direction::Long, 0.1, 100.0).unwrap();

    // Holding through a drop to $80: equity 9800, 2% under the start.
    portfolio.process_bar(1, Action::Long { size: 0.1 }, 80.0).unwrap();

    assert_eq!(portfolio.get_equity_curve(), &[10000.0, 9800.0]);
    assert!((RiskMetrics::max_drawdown(portfolio.get_equity_curve()) + 0.02).abs() < 1e-12);
    assert!(portfolio.get_trades().is_empty());
}

#[test]
fn test_close_position_realizes_profit() {
    let mut portfolio = Portfolio::new(10000.0, 0.0);

    portfolio.open_position(0, Direction::Long, 0.1, 100.0).unwrap();
    portfolio.close_position(1, 110.0, ExitReason::Signal).unwrap();

    assert_eq!(portfolio.get_trades()[0].profit, 100.0);
    assert_eq!(portfolio.cash, 10100.0);
    assert_eq!(portfolio.position_value, 0.0);
    assert!(portfolio.position.is_none());
}

#[test]
fn test_commission_charged_on_both_sides() {
    let mut portfolio = Portfolio::new(10000.0, 0.001);

    // $5000 notional in and out at the same price costs $5 each way.
    portfolio.open_position(0, Direction::Long, 0.5, 100.0).unwrap();
    portfolio.close_position(1, 100.0, ExitReason::Signal).unwrap();

    let trade = &portfolio.get_trades()[0];
    assert!((trade.fees - 10.0).abs() < 1e-9);
    assert!((portfolio.cash - 9990.0).abs() < 1e-9);
    assert!(trade.return_pct() < 0.0);
}

#[test]
fn test_reversal_closes_then_opens() {
    let mut portfolio = Portfolio::new(10000.0, 0.0);

    portfolio.process_bar(0, Action::Long { size: 0.2 }, 100.0).unwrap();
    portfolio.process_bar(1, Action::Short { size: 0.2 }, 105.0).unwrap();

    let trades = portfolio.get_trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].direction, Direction::Long);
    assert_eq!(trades[0].exit_bar, 1);
    assert_eq!(portfolio.position.as_ref().map(|p| p.direction), Some(Direction::Short));
}

#[test]
fn test_finish_force_closes_open_position() {
    let mut portfolio = Portfolio::new(10000.0, 0.0);

    portfolio.process_bar(0, Action::Long { size: 0.1 }, 100.0).unwrap();
    portfolio.process_bar(1, Action::Long { size: 0.1 }, 101.0).unwrap();
    portfolio.finish(2, 102.0).unwrap();

    let trades = portfolio.get_trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].exit_reason, ExitReason::EndOfData);
    // Initial equity plus one mark per bar.
    assert_eq!(portfolio.get_equity_curve().len(), 4);
}
