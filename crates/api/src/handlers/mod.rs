pub mod campaigns;
pub mod cron;
pub mod webhooks;
