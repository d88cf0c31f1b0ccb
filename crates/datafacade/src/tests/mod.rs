mod helpers;

mod index_tests;
