// Test modules for Huddle
// Each module exercises one area of the messaging core against the
// in-memory SQLite backend

mod conversations_tests;
