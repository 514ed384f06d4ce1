mod account;
mod admin;
mod blackjack;
mod pvp;
mod tables;
