#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use treelox as lox;

    use lox::interpreter::Interpreter;
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::Scanner;

    /// Shared byte sink so the test can read everything `print` wrote after
    /// the interpreter is done with its half.
    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Outcome of pushing a source string through the full pipeline:
    /// captured `print` output plus every error, rendered, from whichever
    /// stage produced any.  Later stages never run once a stage errors
    /// (except the evaluator, whose output up to the error is kept).
    struct Outcome {
        output: String,
        errors: Vec<String>,
    }

    fn run(source: &str) -> Outcome {
        let (tokens, errors) = Scanner::new(source.as_bytes()).scan_tokens();

        if !errors.is_empty() {
            return Outcome {
                output: String::new(),
                errors: errors.iter().map(ToString::to_string).collect(),
            };
        }

        let (statements, errors) = Parser::new(&tokens).parse();

        if !errors.is_empty() {
            return Outcome {
                output: String::new(),
                errors: errors.iter().map(ToString::to_string).collect(),
            };
        }

        let sink = SharedBuf::default();
        let mut interpreter = Interpreter::with_output(Box::new(sink.clone()));

        let errors = Resolver::new(&mut interpreter).resolve(&statements);

        if !errors.is_empty() {
            return Outcome {
                output: String::new(),
                errors: errors.iter().map(ToString::to_string).collect(),
            };
        }

        let runtime_error = interpreter.interpret(&statements).err();

        let output = String::from_utf8(sink.0.borrow().clone()).expect("print wrote valid UTF-8");

        Outcome {
            output,
            errors: runtime_error.iter().map(ToString::to_string).collect(),
        }
    }

    fn assert_prints(source: &str, expected: &str) {
        let outcome = run(source);

        assert!(
            outcome.errors.is_empty(),
            "Expected a clean run for {:?}, got errors: {:?}",
            source,
            outcome.errors
        );

        assert_eq!(outcome.output, expected, "Source: {:?}", source);
    }

    fn assert_errors_with(source: &str, fragment: &str) {
        let outcome = run(source);

        assert!(
            outcome
                .errors
                .iter()
                .any(|e| e.contains(fragment)),
            "Expected an error containing {:?} for {:?}, got: {:?}",
            fragment,
            source,
            outcome.errors
        );
    }

    // ───────────────────── expressions and printing ─────────────────────

    #[test]
    fn test_interp_01_arithmetic() {
        assert_prints("print 1 + 2 * 3;", "7\n");
        assert_prints("print (1 + 2) * 3;", "9\n");
        assert_prints("print 10 - 4 / 2;", "8\n");
        assert_prints("print -5 + 3;", "-2\n");
    }

    #[test]
    fn test_interp_02_number_display() {
        // whole values drop the fraction, others print as-is
        assert_prints("print 3.0;", "3\n");
        assert_prints("print 2.5;", "2.5\n");
        assert_prints("print 0 - 0.5;", "-0.5\n");
    }

    #[test]
    fn test_interp_03_division_by_zero_is_ieee() {
        assert_prints("print 1 / 0;", "inf\n");
    }

    #[test]
    fn test_interp_04_string_concatenation() {
        assert_prints("print \"foo\" + \"bar\";", "foobar\n");
    }

    #[test]
    fn test_interp_05_comparisons_and_equality() {
        assert_prints("print 1 < 2;", "true\n");
        assert_prints("print 2 <= 2;", "true\n");
        assert_prints("print 3 > 4;", "false\n");

        assert_prints("print nil == nil;", "true\n");
        assert_prints("print 1 == 1;", "true\n");
        assert_prints("print \"a\" == \"a\";", "true\n");

        // mixed kinds are unequal, never an error
        assert_prints("print 1 == \"1\";", "false\n");
        assert_prints("print nil == false;", "false\n");
        assert_prints("print 1 != 2;", "true\n");
    }

    #[test]
    fn test_interp_06_truthiness() {
        // only nil and false are falsy
        assert_prints("print !nil;", "true\n");
        assert_prints("print !false;", "true\n");
        assert_prints("print !0;", "false\n");
        assert_prints("print !\"\";", "false\n");
    }

    #[test]
    fn test_interp_07_logical_operators_return_operand() {
        assert_prints("print \"hi\" or 2;", "hi\n");
        assert_prints("print nil or \"yes\";", "yes\n");
        assert_prints("print nil and 1;", "nil\n");
        assert_prints("print 1 and \"right\";", "right\n");
    }

    #[test]
    fn test_interp_08_short_circuit_skips_side_effects() {
        assert_prints(
            "fun boom() { print \"called\"; return true; }\n\
             var x = false and boom();\n\
             print x;",
            "false\n",
        );
    }

    // ──────────────────── variables, scopes, closures ───────────────────

    #[test]
    fn test_interp_09_block_scoping_and_shadowing() {
        assert_prints(
            "var a = \"outer\";\n\
             {\n\
               var a = \"inner\";\n\
               print a;\n\
             }\n\
             print a;",
            "inner\nouter\n",
        );
    }

    #[test]
    fn test_interp_10_assignment_is_an_expression() {
        assert_prints("var a = 1; print a = 2; print a;", "2\n2\n");
    }

    #[test]
    fn test_interp_11_closure_counter() {
        assert_prints(
            "fun makeCounter() {\n\
               var count = 0;\n\
               fun inc() {\n\
                 count = count + 1;\n\
                 return count;\n\
               }\n\
               return inc;\n\
             }\n\
             var counter = makeCounter();\n\
             print counter();\n\
             print counter();",
            "1\n2\n",
        );
    }

    #[test]
    fn test_interp_12_closures_capture_definition_scope() {
        // the later declaration in the same block must not be visible to
        // the already-defined closure
        assert_prints(
            "var a = \"global\";\n\
             {\n\
               fun show() { print a; }\n\
               show();\n\
               var a = \"block\";\n\
               show();\n\
             }",
            "global\nglobal\n",
        );
    }

    #[test]
    fn test_interp_13_recursion() {
        assert_prints(
            "fun fib(n) {\n\
               if (n < 2) return n;\n\
               return fib(n - 1) + fib(n - 2);\n\
             }\n\
             print fib(10);",
            "55\n",
        );
    }

    // ─────────────────────────── control flow ───────────────────────────

    #[test]
    fn test_interp_14_if_else() {
        assert_prints("if (1 < 2) print \"then\"; else print \"else\";", "then\n");
        assert_prints("if (nil) print \"then\"; else print \"else\";", "else\n");
        assert_prints("if (false) print \"then\";", "");
    }

    #[test]
    fn test_interp_15_while_loop() {
        assert_prints(
            "var i = 0;\n\
             while (i < 3) {\n\
               print i;\n\
               i = i + 1;\n\
             }",
            "0\n1\n2\n",
        );
    }

    #[test]
    fn test_interp_16_for_loop() {
        assert_prints("for (var i = 0; i < 3; i = i + 1) print i;", "0\n1\n2\n");
    }

    #[test]
    fn test_interp_17_return_unwinds_nested_blocks() {
        assert_prints(
            "fun find() {\n\
               for (var i = 0; i < 10; i = i + 1) {\n\
                 if (i == 3) {\n\
                   return i;\n\
                 }\n\
               }\n\
               return -1;\n\
             }\n\
             print find();",
            "3\n",
        );
    }

    #[test]
    fn test_interp_18_bare_and_missing_return_yield_nil() {
        assert_prints("fun a() { return; } print a();", "nil\n");
        assert_prints("fun b() { } print b();", "nil\n");
    }

    // ──────────────────────── functions and natives ─────────────────────

    #[test]
    fn test_interp_19_function_display_forms() {
        assert_prints("fun f() {} print f;", "<fun f>\n");
        assert_prints("print clock;", "<native fn clock>\n");
        assert_prints("class C {} print C;", "<class C>\n");
        assert_prints("class C {} print C();", "<instance of C>\n");
    }

    #[test]
    fn test_interp_20_clock_returns_a_number() {
        assert_prints("print clock() > 0;", "true\n");
    }

    #[test]
    fn test_interp_21_arguments_evaluate_left_to_right() {
        assert_prints(
            "fun note(label) { print label; return label; }\n\
             fun pair(a, b) { }\n\
             pair(note(\"first\"), note(\"second\"));",
            "first\nsecond\n",
        );
    }

    #[test]
    fn test_interp_22_function_equality_is_identity() {
        assert_prints(
            "fun f() {}\n\
             var g = f;\n\
             print f == g;\n\
             fun h() {}\n\
             print f == h;",
            "true\nfalse\n",
        );
    }

    // ─────────────────────── classes and instances ──────────────────────

    #[test]
    fn test_interp_23_fields() {
        assert_prints(
            "class Bag {}\n\
             var bag = Bag();\n\
             bag.item = \"apple\";\n\
             print bag.item;\n\
             bag.item = \"pear\";\n\
             print bag.item;",
            "apple\npear\n",
        );
    }

    #[test]
    fn test_interp_24_methods_and_this() {
        assert_prints(
            "class Greeter {\n\
               greet() {\n\
                 print \"hello \" + this.name;\n\
               }\n\
             }\n\
             var g = Greeter();\n\
             g.name = \"world\";\n\
             g.greet();",
            "hello world\n",
        );
    }

    #[test]
    fn test_interp_25_initializer() {
        assert_prints(
            "class Counter {\n\
               init(start) {\n\
                 this.count = start;\n\
               }\n\
               inc() {\n\
                 this.count = this.count + 1;\n\
                 return this.count;\n\
               }\n\
             }\n\
             var c = Counter(3);\n\
             print c.inc();\n\
             print c.inc();",
            "4\n5\n",
        );
    }

    #[test]
    fn test_interp_26_initializer_always_returns_the_instance() {
        // a bare `return;` inside init still yields the instance
        assert_prints(
            "class Guard {\n\
               init() {\n\
                 this.ok = true;\n\
                 return;\n\
                 this.ok = false;\n\
               }\n\
             }\n\
             print Guard().ok;",
            "true\n",
        );

        // calling init directly through an instance re-runs it and hands
        // the instance back
        assert_prints(
            "class Box {\n\
               init(v) { this.v = v; }\n\
             }\n\
             var b = Box(1);\n\
             print b.init(9).v;",
            "9\n",
        );
    }

    #[test]
    fn test_interp_27_bound_method_keeps_its_instance() {
        assert_prints(
            "class Cell {\n\
               init(v) { this.v = v; }\n\
               read() { return this.v; }\n\
             }\n\
             var cell = Cell(7);\n\
             var read = cell.read;\n\
             print read();",
            "7\n",
        );
    }

    #[test]
    fn test_interp_28_fields_shadow_methods() {
        assert_prints(
            "class Thing {\n\
               label() { return \"method\"; }\n\
             }\n\
             var t = Thing();\n\
             t.label = \"field\";\n\
             print t.label;",
            "field\n",
        );
    }

    #[test]
    fn test_interp_29_instance_equality_is_identity() {
        assert_prints(
            "class C {}\n\
             var a = C();\n\
             var b = C();\n\
             print a == a;\n\
             print a == b;",
            "true\nfalse\n",
        );
    }

    // ─────────────────────────── runtime errors ─────────────────────────

    #[test]
    fn test_interp_30_undefined_variable() {
        assert_errors_with("print missing;", "Undefined variable 'missing'.");
        assert_errors_with("missing = 1;", "Undefined variable 'missing'.");
    }

    #[test]
    fn test_interp_31_operand_type_errors() {
        assert_errors_with("print -\"muffin\";", "Operand must be a number.");
        assert_errors_with("print 1 < \"two\";", "Operands must be numbers.");
        assert_errors_with("print 1 + \"two\";", "Operands must be numbers or strings.");
    }

    #[test]
    fn test_interp_32_call_errors() {
        assert_errors_with("\"text\"();", "Can only call functions and classes.");
        assert_errors_with(
            "fun two(a, b) {} two(1);",
            "Expected 2 arguments but got 1.",
        );
        assert_errors_with("clock(1);", "Expected 0 arguments but got 1.");
        assert_errors_with(
            "class C { init(a) {} } C();",
            "Expected 1 arguments but got 0.",
        );
    }

    #[test]
    fn test_interp_33_property_errors() {
        assert_errors_with("print 4.value;", "Only instances have properties.");
        assert_errors_with("true.value = 1;", "Only instances have fields.");
        assert_errors_with(
            "class C {} print C().nothing;",
            "Undefined property 'nothing'.",
        );
    }

    #[test]
    fn test_interp_34_runtime_error_format_and_abort() {
        let outcome = run("print \"before\";\nprint missing;\nprint \"after\";");

        // output up to the error survives; nothing after it runs
        assert_eq!(outcome.output, "before\n");

        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(
            outcome.errors[0],
            "Undefined variable 'missing'.\n[line 2]"
        );
    }

    // ─────────────────────────── static errors ──────────────────────────

    #[test]
    fn test_interp_35_resolver_rejects_top_level_return() {
        assert_errors_with("return 1;", "Can't return from top-level code");
    }

    #[test]
    fn test_interp_36_resolver_rejects_this_outside_class() {
        assert_errors_with("print this;", "Can't use 'this' outside of a class");
        assert_errors_with("fun f() { return this; } f();", "Can't use 'this' outside of a class");
    }

    #[test]
    fn test_interp_37_resolver_rejects_self_referential_initializer() {
        assert_errors_with("var a = a;", "Can't read local variable in its own initializer");
        assert_errors_with(
            "{ var b = 1; var c = c; }",
            "Can't read local variable in its own initializer",
        );
    }

    #[test]
    fn test_interp_38_resolver_rejects_redeclaration() {
        assert_errors_with(
            "var a = 1; var a = 2;",
            "Already a variable with this name in this scope",
        );
        assert_errors_with(
            "fun f(x) { var x = 2; }",
            "Already a variable with this name in this scope",
        );
    }

    #[test]
    fn test_interp_39_resolver_rejects_value_return_in_initializer() {
        assert_errors_with(
            "class C { init() { return 1; } }",
            "Can't return a value from an initializer",
        );

        // a bare return in an initializer is fine
        assert_prints("class C { init() { return; } } C();", "");
    }

    #[test]
    fn test_interp_40_static_errors_suppress_execution() {
        // the print must not run when resolution fails
        let outcome = run("print \"unreachable\"; return 1;");

        assert_eq!(outcome.output, "");
        assert!(!outcome.errors.is_empty());
    }

    #[test]
    fn test_interp_41_multiple_static_errors_in_one_pass() {
        let outcome = run("return 1; print this;");

        assert_eq!(outcome.errors.len(), 2, "Got: {:?}", outcome.errors);
        assert!(outcome.errors[0].contains("Can't return from top-level code"));
        assert!(outcome.errors[1].contains("Can't use 'this' outside of a class"));
    }

    #[test]
    fn test_interp_42_static_error_format() {
        let outcome = run("var a = 1;\nreturn;");

        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(
            outcome.errors[0],
            "[line 2] Error: Can't return from top-level code"
        );
    }
}
