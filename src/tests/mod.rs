mod compile_tests;
mod execution_tests;
